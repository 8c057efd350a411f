use serde::Serialize;

use crate::{aggregate::Aggregate, layout::CategoryPlan};

/// Contents of `plans.json`, for renderers other than ours.
#[derive(Debug, Serialize)]
pub struct JsonPlans<'a> {
    pub runs: Vec<JsonRun<'a>>,
    pub categories: &'a [CategoryPlan],
}

#[derive(Debug, Serialize)]
pub struct JsonRun<'a> {
    pub path: &'a str,
    pub description: &'a str,
}

impl<'a> JsonPlans<'a> {
    pub fn new(aggregate: &'a Aggregate, categories: &'a [CategoryPlan]) -> Self {
        let runs = aggregate
            .groups()
            .iter()
            .map(|group| JsonRun {
                path: &group.path,
                description: group.description(),
            })
            .collect();

        Self { runs, categories }
    }
}

#[test]
fn test_json_plans() -> jane_eyre::eyre::Result<()> {
    use crate::{
        event::{Category, Event, EventGroup},
        layout::{plan_category, LayoutConfig},
    };

    let mut group = EventGroup::new("a.surflog");
    group.push_info("GTX 480");
    group.push(Event::new(Category::Kernel, "Scan", 1.25));
    let mut other = EventGroup::new("b.surflog");
    other.push_info("HD 5870");
    let aggregate = Aggregate::new(vec![group, other]);
    let plans = [plan_category(&aggregate, Category::Kernel, &LayoutConfig::default())];

    let json = serde_json::to_value(JsonPlans::new(&aggregate, &plans))?;
    assert_eq!(json["runs"][1]["description"], "HD 5870");
    let chart = &json["categories"][0]["charts"][0];
    assert_eq!(chart["item"], "Scan");
    assert_eq!(chart["values"], serde_json::json!([1.25, null]));
    assert_eq!(chart["axis_max"], 1.5);
    assert_eq!(json["categories"][0]["grid"]["legend_slots"], serde_json::json!([2]));
    Ok(())
}
