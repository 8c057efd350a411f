use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{aggregate::Aggregate, event::Category};

/// Granularity of the value axis.
static AXIS_STEP: f64 = 0.5;

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub items_per_row: usize,
    /// One colour per run, cycled if there are more runs than colours.
    pub palette: Vec<String>,
    /// Height drawn for missing or zero values so that their bars stay visible.
    pub epsilon: f64,
}

/// Where each chart of one category goes, in a grid with a legend column on the right.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Grid {
    pub rows: usize,
    pub columns: usize,
    pub display_columns: usize,
    /// Slot index of each item, in master-list order.
    pub slots: Vec<usize>,
    pub legend_slots: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunValue {
    Present(f64),
    Missing,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChartPlan {
    pub category: Category,
    pub index: usize,
    pub item: String,
    pub values: Vec<RunValue>,
    pub axis_max: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CategoryPlan {
    pub category: Category,
    pub grid: Grid,
    pub legend: Vec<String>,
    pub charts: Vec<ChartPlan>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            items_per_row: 8,
            palette: "green blue cyan red magenta black yellow white"
                .split(" ")
                .map(str::to_owned)
                .collect(),
            epsilon: 0.00000001,
        }
    }
}

impl LayoutConfig {
    pub fn colour(&self, run: usize) -> &str {
        if self.palette.is_empty() {
            return "black";
        }
        &self.palette[run % self.palette.len()]
    }
}

impl Grid {
    pub fn new(item_count: usize, items_per_row: usize) -> Self {
        if item_count == 0 || items_per_row == 0 {
            return Self {
                rows: 0,
                columns: 0,
                display_columns: 0,
                slots: vec![],
                legend_slots: vec![],
            };
        }

        let columns = items_per_row.min(item_count);
        let display_columns = columns + 1;
        let rows = item_count.div_ceil(items_per_row);

        let mut slots = Vec::with_capacity(item_count);
        let mut slot = 0;
        for _ in 0..item_count {
            if Self::is_legend_slot(slot, display_columns) {
                slot += 1;
            }
            slots.push(slot);
            slot += 1;
        }
        let legend_slots = (0..rows).map(|row| row * display_columns + columns).collect();

        Self {
            rows,
            columns,
            display_columns,
            slots,
            legend_slots,
        }
    }

    fn is_legend_slot(slot: usize, display_columns: usize) -> bool {
        slot % display_columns == display_columns - 1
    }
}

impl RunValue {
    pub fn value(&self) -> Option<f64> {
        match *self {
            RunValue::Present(value) => Some(value),
            RunValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RunValue::Missing)
    }

    /// Height to draw. Never used to change the stored value.
    pub fn bar_height(&self, epsilon: f64) -> f64 {
        match *self {
            RunValue::Present(value) if value > epsilon => value,
            _ => epsilon,
        }
    }
}

impl ChartPlan {
    pub fn new(category: Category, index: usize, item: &str, values: Vec<RunValue>) -> Self {
        let max = values
            .iter()
            .filter_map(RunValue::value)
            .max_by(|p, q| p.total_cmp(q))
            .unwrap_or(0.0)
            .max(0.0);

        Self {
            category,
            index,
            item: item.to_owned(),
            values,
            axis_max: round_up(max),
        }
    }

    pub fn ticks(&self) -> [f64; 3] {
        [0.0, self.axis_max / 2.0, self.axis_max]
    }
}

/// Smallest multiple of [AXIS_STEP] strictly greater than `value`.
pub fn round_up(value: f64) -> f64 {
    ((value / AXIS_STEP).floor() + 1.0) * AXIS_STEP
}

pub fn plan_category(
    aggregate: &Aggregate,
    category: Category,
    config: &LayoutConfig,
) -> CategoryPlan {
    let items = aggregate.master_list(category);
    let grid = Grid::new(items.len(), config.items_per_row);
    debug!(%category, rows = grid.rows, display_columns = grid.display_columns, "Planned grid");

    let charts = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            ChartPlan::new(category, index, item, aggregate.values(category, item))
        })
        .collect();

    CategoryPlan {
        category,
        grid,
        legend: aggregate.legend(),
        charts,
    }
}

#[test]
fn test_grid() {
    let grid = Grid::new(10, 8);
    assert_eq!(grid.columns, 8);
    assert_eq!(grid.display_columns, 9);
    assert_eq!(grid.rows, 2);
    assert_eq!(grid.slots, [0, 1, 2, 3, 4, 5, 6, 7, 9, 10]);
    assert_eq!(grid.legend_slots, [8, 17]);

    let grid = Grid::new(1, 8);
    assert_eq!((grid.rows, grid.columns, grid.display_columns), (1, 1, 2));
    assert_eq!(grid.slots, [0]);
    assert_eq!(grid.legend_slots, [1]);

    let grid = Grid::new(16, 8);
    assert_eq!(grid.slots[8..], [9, 10, 11, 12, 13, 14, 15, 16]);
    assert_eq!(grid.legend_slots, [8, 17]);
}

#[test]
fn test_empty_grid() {
    assert_eq!(
        Grid::new(0, 8),
        Grid {
            rows: 0,
            columns: 0,
            display_columns: 0,
            slots: vec![],
            legend_slots: vec![],
        }
    );
}

#[test]
fn test_chart_plan_missing_values() {
    let plan = ChartPlan::new(
        Category::Kernel,
        0,
        "A",
        vec![RunValue::Present(4.0), RunValue::Missing],
    );
    assert_eq!(plan.axis_max, 4.5);
    assert_eq!(plan.ticks(), [0.0, 2.25, 4.5]);
    assert_eq!(plan.values[1].bar_height(0.001), 0.001);

    let plan = ChartPlan::new(Category::Io, 0, "B", vec![RunValue::Missing]);
    assert_eq!(plan.axis_max, 0.5);
}

#[test]
fn test_zero_duration_is_present() {
    let value = RunValue::Present(0.0);
    assert!(!value.is_missing());
    assert_eq!(value.value(), Some(0.0));
    assert_eq!(value.bar_height(0.001), 0.001);

    let plan = ChartPlan::new(
        Category::User,
        0,
        "marker",
        vec![RunValue::Present(0.0), RunValue::Present(0.0)],
    );
    assert_eq!(plan.axis_max, 0.5);
    assert_eq!(plan.values, [RunValue::Present(0.0), RunValue::Present(0.0)]);
}

#[test]
fn test_plan_category() {
    use crate::event::{Event, EventGroup};

    let mut first = EventGroup::new("1.surflog");
    first.push_info("run one");
    first.push(Event::new(Category::Kernel, "A", 4.0));
    let mut second = EventGroup::new("2.surflog");
    second.push_info("run two");
    second.push(Event::new(Category::Kernel, "B", 1.2));
    let aggregate = Aggregate::new(vec![first, second]);

    let plan = plan_category(&aggregate, Category::Kernel, &LayoutConfig::default());
    assert_eq!(plan.legend, ["run one", "run two"]);
    assert_eq!(plan.grid.slots, [0, 1, 2]);
    let items = plan.charts.iter().map(|c| &*c.item).collect::<Vec<_>>();
    assert_eq!(items, ["A", "Total", "B"]);
    assert_eq!(plan.charts[0].values, [RunValue::Present(4.0), RunValue::Missing]);
    assert_eq!(plan.charts[1].axis_max, 4.5);
    assert_eq!(plan.charts[2].axis_max, 1.5);
}
