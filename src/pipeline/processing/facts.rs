//! Fact derivation: accepted records joined against resolved dimension ids.
//! One fact row per accepted input row; metrics are carried unchanged at
//! scale 2, no aggregation and no float arithmetic.

use crate::domain::{
    CanonicalKey, FactForecast, FactSales, NormalizedForecast, NormalizedSales, RejectReason,
};
use crate::error::Result;
use crate::pipeline::processing::resolve::DimensionResolver;
use crate::storage::Store;
use rust_decimal::Decimal;

/// Fact rows ready for load plus the rows that could not be resolved against
/// a dimension, keyed for the audit trail.
pub struct FactBatch<T> {
    pub facts: Vec<T>,
    pub rejected: Vec<(CanonicalKey, RejectReason)>,
}

impl<T> Default for FactBatch<T> {
    fn default() -> Self {
        Self {
            facts: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

pub struct FactBuilder<'a, S: Store> {
    resolver: DimensionResolver<'a, S>,
}

impl<'a, S: Store> FactBuilder<'a, S> {
    pub fn new(resolver: DimensionResolver<'a, S>) -> Self {
        Self { resolver }
    }

    pub fn build_sales_facts(&mut self, accepted: &[NormalizedSales]) -> Result<FactBatch<FactSales>> {
        let mut batch = FactBatch::default();
        for record in accepted {
            let material_id = self.resolver.resolve_material(&record.material_number)?;
            let time_id = self.resolver.resolve_time(&record.period, record.year)?;
            match self.resolver.resolve_region(&record.region_code)? {
                Some(_) => batch.facts.push(FactSales {
                    material_id,
                    time_id,
                    region_code: record.region_code.clone(),
                    gross_sales: record.gross_sales,
                    net_sales: record.net_sales,
                }),
                None => batch.rejected.push((
                    record.canonical_key(),
                    RejectReason::UnresolvedDimension(format!("region {}", record.region_code)),
                )),
            }
        }
        Ok(batch)
    }

    pub fn build_forecast_facts(
        &mut self,
        accepted: &[NormalizedForecast],
    ) -> Result<FactBatch<FactForecast>> {
        let mut batch = FactBatch::default();
        for record in accepted {
            let material_id = self.resolver.resolve_material(&record.material_number)?;
            let time_id = self.resolver.resolve_time(&record.period, record.year)?;
            batch.facts.push(FactForecast {
                material_id,
                time_id,
                forecast_value: record.forecast_value,
            });
        }
        Ok(batch)
    }
}

/// Variance of actual net sales against forecast, as a percentage rounded to
/// two places. An absent or zero forecast yields no variance, never a
/// division fault. Mirrors the `vw_sales_vs_forecast` view column.
pub fn variance_percentage(net_sales: Decimal, forecast_value: Option<Decimal>) -> Option<Decimal> {
    let forecast = forecast_value?;
    if forecast.is_zero() {
        return None;
    }
    Some(((net_sales - forecast) / forecast * Decimal::ONE_HUNDRED).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    fn sales(material: &str, period: &str, region: &str) -> NormalizedSales {
        NormalizedSales {
            material_number: material.to_string(),
            period: period.to_string(),
            year: period[..4].parse().unwrap(),
            region_code: region.to_string(),
            gross_sales: Decimal::new(10000, 2),
            net_sales: Decimal::new(9500, 2),
        }
    }

    #[test]
    fn test_one_fact_row_per_accepted_record() {
        let mut store = InMemoryStore::new();
        let mut builder = FactBuilder::new(DimensionResolver::new(&mut store));
        let accepted = vec![
            sales("00012345", "2024.03", "1"),
            sales("00012345", "2024.03", "1"),
            sales("00067890", "2024.04", "2"),
        ];
        let batch = builder.build_sales_facts(&accepted).unwrap();
        assert_eq!(batch.facts.len(), 3);
        assert!(batch.rejected.is_empty());
        // Duplicate business keys share dimension ids.
        assert_eq!(batch.facts[0].material_id, batch.facts[1].material_id);
        assert_eq!(batch.facts[0].time_id, batch.facts[1].time_id);
        assert_ne!(batch.facts[0].material_id, batch.facts[2].material_id);
    }

    #[test]
    fn test_unresolvable_region_rejects_the_row() {
        // The validator would normally catch this; the builder still refuses
        // to emit a fact without a dimension row behind it.
        let mut store = InMemoryStore::new();
        let mut builder = FactBuilder::new(DimensionResolver::new(&mut store));
        let batch = builder
            .build_sales_facts(&[sales("00012345", "2024.03", "9")])
            .unwrap();
        assert!(batch.facts.is_empty());
        assert_eq!(batch.rejected.len(), 1);
        assert!(matches!(
            batch.rejected[0].1,
            RejectReason::UnresolvedDimension(_)
        ));
    }

    #[test]
    fn test_forecast_facts_share_dimensions_with_sales() {
        let mut store = InMemoryStore::new();
        let mut builder = FactBuilder::new(DimensionResolver::new(&mut store));
        let sales_batch = builder
            .build_sales_facts(&[sales("00012345", "2024.01", "1")])
            .unwrap();
        let forecast_batch = builder
            .build_forecast_facts(&[NormalizedForecast {
                material_number: "00012345".to_string(),
                period: "2024.01".to_string(),
                year: 2024,
                forecast_value: Decimal::new(8000, 2),
            }])
            .unwrap();
        assert_eq!(
            sales_batch.facts[0].material_id,
            forecast_batch.facts[0].material_id
        );
        assert_eq!(sales_batch.facts[0].time_id, forecast_batch.facts[0].time_id);
    }

    #[test]
    fn test_variance_percentage_rounding() {
        let variance = variance_percentage(
            Decimal::new(10000, 2),
            Some(Decimal::new(8000, 2)),
        )
        .unwrap();
        assert_eq!(variance.to_string(), "25.00");

        let variance = variance_percentage(
            Decimal::new(10000, 2),
            Some(Decimal::new(30000, 2)),
        )
        .unwrap();
        // (100 - 300) / 300 * 100 = -66.666...
        assert_eq!(variance.to_string(), "-66.67");
    }

    #[test]
    fn test_variance_is_none_without_forecast() {
        assert!(variance_percentage(Decimal::new(10000, 2), None).is_none());
        assert!(variance_percentage(Decimal::new(10000, 2), Some(Decimal::ZERO)).is_none());
    }
}
