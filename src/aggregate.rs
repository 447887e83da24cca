use crate::schema::Schema;
use crate::types::{
    GroupTotals, Pollutant, PollutantSet, ProjectRecord, RegionSummaryRow, SegmentTotals, Status,
};
use crate::util::{format_number, safe_ratio};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Bucket name for rows with no value in the grouping column.
pub const NO_GROUP: &str = "(none)";

/// Rows partitioned by status. Every slice keeps source order and borrows
/// from the record set, which is never reordered.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    pub all: Vec<&'a ProjectRecord>,
    pub completed: Vec<&'a ProjectRecord>,
    pub pipeline: Vec<&'a ProjectRecord>,
}

pub fn segment(records: &[ProjectRecord]) -> Segments<'_> {
    let mut seg = Segments {
        all: records.iter().collect(),
        completed: Vec::new(),
        pipeline: Vec::new(),
    };
    for r in records {
        match r.status_class() {
            Status::Completed => seg.completed.push(r),
            Status::InProgress => seg.pipeline.push(r),
            Status::Other => {}
        }
    }
    seg
}

pub fn summarize(label: &str, rows: &[&ProjectRecord], schema: &Schema) -> SegmentTotals {
    let mut totals = SegmentTotals {
        label: label.to_string(),
        count: rows.len(),
        ..SegmentTotals::default()
    };
    for r in rows {
        totals.total_co2_tons += r.total_co2_tons;
        totals.total_cost_savings += r.total_cost_savings;
        totals.implementation_cost += r.implementation_cost;
        for p in Pollutant::ALL {
            *totals.pollutant_lb.get_mut(p) += r.total_lb(p);
        }
    }
    totals.cars_equivalent = safe_ratio(totals.total_co2_tons, schema.tons_co2_per_car);
    totals
}

/// Categorical column to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    Region,
    RegionCode,
    EquipmentType,
    Status,
    Year,
}

impl GroupKey {
    fn value_of(self, r: &ProjectRecord) -> Option<String> {
        let raw = match self {
            GroupKey::Region => r.region.clone(),
            GroupKey::RegionCode => r.fips_code.clone().unwrap_or_default(),
            GroupKey::EquipmentType => r.equipment_type.clone(),
            GroupKey::Status => r.status.clone(),
            GroupKey::Year if r.year == 0 => String::new(),
            GroupKey::Year => r.year.to_string(),
        };
        if raw.is_empty() {
            None
        } else {
            Some(raw)
        }
    }
}

/// Sum rows per bucket. Buckets come out in order of first appearance and
/// rows without a value land in the `NO_GROUP` bucket rather than vanishing.
pub fn group_totals(rows: &[&ProjectRecord], key: GroupKey) -> Vec<GroupTotals> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<GroupTotals> = Vec::new();
    for r in rows {
        let name = key.value_of(r).unwrap_or_else(|| NO_GROUP.to_string());
        let slot = *index.entry(name.clone()).or_insert_with(|| {
            groups.push(GroupTotals {
                key: name,
                ..GroupTotals::default()
            });
            groups.len() - 1
        });
        let g = &mut groups[slot];
        g.count += 1;
        g.total_co2_tons += r.total_co2_tons;
        g.total_cost_savings += r.total_cost_savings;
        g.total_nox_lb += r.total_lb(Pollutant::Nox);
    }
    groups
}

/// Highest-impact rows by CO2 tons. The sort is stable and runs on a copy of
/// the reference list, so ties keep source order.
pub fn top_by_co2<'a>(rows: &[&'a ProjectRecord], n: usize) -> Vec<&'a ProjectRecord> {
    let mut ranked: Vec<&ProjectRecord> = rows.to_vec();
    ranked.sort_by(|a, b| {
        b.total_co2_tons
            .partial_cmp(&a.total_co2_tons)
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(n);
    ranked
}

/// Everything the report assembler needs besides the rows themselves.
#[derive(Debug, Clone, Serialize)]
pub struct Aggregation {
    pub all: SegmentTotals,
    pub completed: SegmentTotals,
    pub pipeline: SegmentTotals,
    pub completed_by_region: Vec<GroupTotals>,
    pub completed_by_year: Vec<GroupTotals>,
    pub by_status: Vec<GroupTotals>,
}

pub fn aggregate(records: &[ProjectRecord], schema: &Schema) -> Aggregation {
    let seg = segment(records);
    Aggregation {
        all: summarize("All Projects", &seg.all, schema),
        completed: summarize(Status::Completed.label(), &seg.completed, schema),
        pipeline: summarize(Status::InProgress.label(), &seg.pipeline, schema),
        completed_by_region: group_totals(&seg.completed, GroupKey::Region),
        completed_by_year: sorted_by_key(group_totals(&seg.completed, GroupKey::Year)),
        by_status: group_totals(&seg.all, GroupKey::Status),
    }
}

fn sorted_by_key(mut groups: Vec<GroupTotals>) -> Vec<GroupTotals> {
    groups.sort_by(|a, b| a.key.cmp(&b.key));
    groups
}

/// Console view of per-region totals, largest CO2 first.
pub fn region_summary(groups: &[GroupTotals]) -> Vec<RegionSummaryRow> {
    let mut ranked: Vec<&GroupTotals> = groups.iter().collect();
    ranked.sort_by(|a, b| {
        b.total_co2_tons
            .partial_cmp(&a.total_co2_tons)
            .unwrap_or(Ordering::Equal)
    });
    ranked
        .into_iter()
        .map(|g| RegionSummaryRow {
            region: g.key.clone(),
            projects: g.count,
            co2_tons: format_number(g.total_co2_tons, 2),
            nox_lb: format_number(g.total_nox_lb, 2),
            cost_savings: format_number(g.total_cost_savings, 2),
        })
        .collect()
}

/// Pollutant totals keyed by display label, in a fixed order.
pub fn pollutant_rows(totals: &PollutantSet<f64>) -> Vec<(&'static str, f64)> {
    Pollutant::ALL
        .iter()
        .map(|p| (p.label(), *totals.get(*p)))
        .collect()
}
