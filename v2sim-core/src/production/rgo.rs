use crate::country::{CountryEconomy, EconomyReporter};
use crate::definitions::Definitions;
use crate::fixed::Fixed;
use crate::goods::GoodId;
use crate::population::Pop;
use crate::production::ProductionTypeId;
use serde::{Deserialize, Serialize};

/// Resource gathering operation: the province's primary producer.
///
/// Hires from the province's pops each day, sells its whole output on the
/// market and shares the revenue among its paid workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceGatheringOperation {
    pub production_type: ProductionTypeId,
    pub max_employee_count: u32,
    employee_count: u32,
    /// (pop index, employed) for every employee that draws a wage.
    #[serde(skip)]
    paid_employees: Vec<(usize, u32)>,
    output_quantity_yesterday: Fixed,
    revenue_yesterday: Fixed,
}

impl ResourceGatheringOperation {
    pub fn new(production_type: ProductionTypeId, max_employee_count: u32) -> Self {
        Self {
            production_type,
            max_employee_count,
            ..Self::default()
        }
    }

    pub fn employee_count(&self) -> u32 {
        self.employee_count
    }

    pub fn output_quantity_yesterday(&self) -> Fixed {
        self.output_quantity_yesterday
    }

    pub fn revenue_yesterday(&self) -> Fixed {
        self.revenue_yesterday
    }

    /// Hires workers and produces. Returns what to put up for sale.
    pub fn rgo_tick(
        &mut self,
        pops: &mut [Pop],
        definitions: &Definitions,
        reporter: Option<&dyn EconomyReporter>,
    ) -> Option<(GoodId, Fixed)> {
        self.employee_count = 0;
        self.paid_employees.clear();
        self.output_quantity_yesterday = Fixed::ZERO;

        let Some(production_type) = definitions.production_type(self.production_type) else {
            log::error!("RGO has unknown production type {}", self.production_type.0);
            return None;
        };

        let is_job = |pop: &Pop| production_type.jobs.contains(&pop.pop_type);
        let available_workers: u64 = pops.iter().filter(|p| is_job(p)).map(|p| p.size as u64).sum();
        if available_workers == 0 {
            return None;
        }

        // Every eligible pop is hired in the same proportion.
        let max_employees = self.max_employee_count as u64;
        for (index, pop) in pops.iter_mut().enumerate() {
            if !is_job(&*pop) {
                continue;
            }
            let employed = if available_workers <= max_employees {
                pop.size
            } else {
                (pop.size as u64 * max_employees / available_workers) as u32
            };
            pop.hire(employed);
            self.employee_count += employed;

            let is_paid = definitions.pop_type(pop.pop_type).is_some_and(|t| !t.is_slave);
            if employed > 0 && is_paid {
                self.paid_employees.push((index, employed));
            }
        }

        let output = production_type.output_for_workforce(self.employee_count);
        self.output_quantity_yesterday = output;
        if output <= Fixed::ZERO {
            return None;
        }
        if let Some(reporter) = reporter {
            reporter.report_output(production_type, output);
        }
        Some((production_type.output_good, output))
    }

    /// Shares sale revenue among paid workers in proportion to headcount.
    ///
    /// `scratch` holds each worker's share so rounding is settled before any
    /// pop is paid.
    pub fn pay_employees(
        &mut self,
        pops: &mut [Pop],
        revenue: Fixed,
        country: Option<&CountryEconomy>,
        scratch: &mut Vec<Fixed>,
    ) {
        self.revenue_yesterday = revenue;
        if revenue <= Fixed::ZERO {
            return;
        }

        let total_paid: u64 = self.paid_employees.iter().map(|&(_, e)| e as u64).sum();
        if total_paid == 0 {
            log::debug!("RGO revenue {} has no paid workers", revenue);
            return;
        }

        scratch.clear();
        let total_paid = Fixed::from_int(total_paid as i64);
        scratch.extend(
            self.paid_employees
                .iter()
                .map(|&(_, employed)| revenue.mul_div(Fixed::from_int(employed as i64), total_paid)),
        );

        for (&(index, _), &wage) in self.paid_employees.iter().zip(scratch.iter()) {
            match pops.get_mut(index) {
                Some(pop) if wage > Fixed::ZERO => pop.add_rgo_worker_income(wage, country),
                Some(_) => {}
                None => log::error!("RGO employee {} no longer exists", index),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{grain_and_tools_definitions, test_pop, ARTISANS, FARMERS, GRAIN, SLAVES};

    #[test]
    fn test_hires_proportionally_when_oversubscribed() {
        let definitions = grain_and_tools_definitions();
        let farm = definitions.rgo_production_types().next().unwrap();
        let mut rgo = ResourceGatheringOperation::new(farm.id, 30_000);
        let mut pops = vec![test_pop(&definitions, FARMERS, 40_000), test_pop(&definitions, FARMERS, 20_000)];

        let output = rgo.rgo_tick(&mut pops, &definitions, None);
        assert_eq!(pops[0].employed, 20_000);
        assert_eq!(pops[1].employed, 10_000);
        assert_eq!(pops[0].unemployed, 20_000);
        assert_eq!(rgo.employee_count(), 30_000);
        assert_eq!(output, Some((GRAIN, farm.output_for_workforce(30_000))));
    }

    #[test]
    fn test_non_job_pops_not_hired() {
        let definitions = grain_and_tools_definitions();
        let farm = definitions.rgo_production_types().next().unwrap();
        let mut rgo = ResourceGatheringOperation::new(farm.id, 30_000);
        let mut pops = vec![test_pop(&definitions, ARTISANS, 40_000)];
        assert_eq!(rgo.rgo_tick(&mut pops, &definitions, None), None);
        assert_eq!(pops[0].employed, 0);
    }

    #[test]
    fn test_revenue_skips_slaves() {
        let definitions = grain_and_tools_definitions();
        let farm = definitions.rgo_production_types().next().unwrap();
        let mut rgo = ResourceGatheringOperation::new(farm.id, 100_000);
        let mut pops = vec![
            test_pop(&definitions, FARMERS, 30_000),
            test_pop(&definitions, SLAVES, 30_000),
            test_pop(&definitions, FARMERS, 10_000),
        ];
        rgo.rgo_tick(&mut pops, &definitions, None);

        let mut scratch = Vec::new();
        rgo.pay_employees(&mut pops, Fixed::from_int(100), None, &mut scratch);
        assert_eq!(pops[0].cash, Fixed::from_int(75));
        assert_eq!(pops[1].cash, Fixed::ZERO);
        assert_eq!(pops[2].cash, Fixed::from_int(25));
        assert_eq!(rgo.revenue_yesterday(), Fixed::from_int(100));
    }
}
