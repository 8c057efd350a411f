use std::{fs::File, io::Write, path::Path};

use dataurl::DataUrl;
use jane_eyre::eyre::{self, Context};
use poloto::ticks::{
    tick_fmt::TickFmt, IndexRequester, RenderFrameBound, TickDistGen, TickDistribution, TickRes,
};
use tracing::info;

use crate::{
    config::PlotConfig,
    layout::{CategoryPlan, ChartPlan},
};

/// One tick per run, labelled with the run number. The padding ticks either side stay blank.
struct RunTicks(usize);
struct RunFmt(usize);
impl TickFmt<f64> for RunFmt {
    fn write_tick(&self, writer: &mut dyn std::fmt::Write, x: &f64) -> std::fmt::Result {
        let run = x.round() as i128;
        if run < 1 || run > self.0 as i128 {
            return Ok(());
        }
        write!(writer, "{run}")
    }
}
impl TickDistGen<f64> for RunTicks {
    type Res = TickDistribution<Vec<f64>, RunFmt>;
    fn generate(
        self,
        data: &poloto::ticks::DataBound<f64>,
        _: &RenderFrameBound,
        _: IndexRequester,
    ) -> Self::Res {
        let min = data.min.floor() as i128;
        let max = data.max.ceil() as i128;
        TickDistribution {
            res: TickRes { dash_size: None },
            iter: (min..=max).map(|x| x as f64).collect(),
            fmt: RunFmt(self.0),
        }
    }
}

/// Exactly the ticks chosen by the chart plan.
struct ValueTicks([f64; 3]);
struct ValueFmt;
impl TickFmt<f64> for ValueFmt {
    fn write_tick(&self, writer: &mut dyn std::fmt::Write, x: &f64) -> std::fmt::Result {
        write!(writer, "{x}")
    }
}
impl TickDistGen<f64> for ValueTicks {
    type Res = TickDistribution<Vec<f64>, ValueFmt>;
    fn generate(
        self,
        _: &poloto::ticks::DataBound<f64>,
        _: &RenderFrameBound,
        _: IndexRequester,
    ) -> Self::Res {
        TickDistribution {
            res: TickRes { dash_size: None },
            iter: self.0.to_vec(),
            fmt: ValueFmt,
        }
    }
}

/// Renders one bar per run. Run `i` is centred on x = i + 1.
pub fn render_chart(chart: &ChartPlan, epsilon: f64) -> eyre::Result<String> {
    let run_count = chart.values.len();
    let bars = chart.values.iter().enumerate().map(|(i, value)| {
        let x = i as f64 + 1.0;
        poloto::build::plot(format!("{}", i + 1))
            .histogram([(x - 0.5, value.bar_height(epsilon)), (x + 0.5, 0.0)])
    });
    let ticks = chart.ticks();

    let svg = poloto::frame_build()
        .data(poloto::plots!(
            poloto::build::markers([0f64, run_count as f64 + 1.0], [0f64, chart.axis_max]),
            bars
        ))
        .map_xticks(|_| RunTicks(run_count))
        .map_yticks(|_| ValueTicks(ticks))
        .build_and_label((
            format!("Item {}: {}", chart.index, chart.item),
            "run",
            "time (ms)",
        ))
        .append_to(poloto::header().light_theme())
        .render_string()?;

    Ok(svg)
}

/// Writes `<category>.<index>.svg` for every chart and `<category>.html` laying them out on the
/// plan's grid.
#[tracing::instrument(level = "error", skip_all, fields(category = %plan.category))]
pub fn render_category(
    plan: &CategoryPlan,
    config: &PlotConfig,
    out_dir: &Path,
) -> eyre::Result<()> {
    if plan.charts.is_empty() {
        info!("No items; skipping");
        return Ok(());
    }

    let mut svgs = vec![];
    for chart in &plan.charts {
        let svg = render_chart(chart, config.layout.epsilon)
            .wrap_err_with(|| format!("Failed to render {}", chart.item))?;
        let svg_path = out_dir.join(format!("{}.{}.svg", plan.category, chart.index));
        File::create(&svg_path)?.write_all(svg.as_bytes())?;
        svgs.push(svg);
    }

    let html_path = out_dir.join(format!("{}.html", plan.category));
    info!(?html_path, charts = svgs.len(), "Writing charts");
    File::create(&html_path)?.write_all(html_page(plan, &svgs, config).as_bytes())?;

    Ok(())
}

pub fn html_page(plan: &CategoryPlan, svgs: &[String], config: &PlotConfig) -> String {
    let grid = &plan.grid;
    let mut result = String::default();
    result.push_str("<!doctype html><meta charset=utf-8>\n");
    result.push_str(&format!(
        "<title>{}</title>\n<h1>{}</h1>\n",
        escape_html_for_inner_html(&plan.category.title()),
        escape_html_for_inner_html(&plan.category.title()),
    ));
    result.push_str("<table>\n");
    for row in 0..grid.rows {
        result.push_str("<tr>\n");
        for column in 0..grid.display_columns {
            let slot = row * grid.display_columns + column;
            if grid.legend_slots.contains(&slot) {
                result.push_str(&legend_cell(&plan.legend, config));
            } else if let Some(index) = grid.slots.iter().position(|&s| s == slot) {
                let mut url = DataUrl::new();
                url.set_media_type(Some("image/svg+xml".to_owned()));
                url.set_data(svgs[index].as_bytes());
                result.push_str(&format!(
                    "<td><img src='{}' width={} height={} alt='{}'>\n",
                    url.to_string(),
                    config.width,
                    config.height,
                    escape_html_for_attribute(&plan.charts[index].item),
                ));
            } else {
                result.push_str("<td>\n");
            }
        }
    }
    result.push_str("</table>\n");

    result
}

fn legend_cell(legend: &[String], config: &PlotConfig) -> String {
    let mut result = "<td><ol>\n".to_owned();
    for (i, label) in legend.iter().enumerate() {
        result.push_str(&format!(
            "<li style='color: {}'>{}\n",
            escape_html_for_attribute(config.layout.colour(i)),
            escape_html_for_inner_html(label),
        ));
    }
    result.push_str("</ol>\n");

    result
}

fn escape_html_for_inner_html(text: &str) -> String {
    text.replace("&", "&amp;").replace("<", "&lt;")
}

fn escape_html_for_attribute(text: &str) -> String {
    text.replace("&", "&amp;")
        .replace("'", "&apos;")
        .replace(r#"""#, "&quot;")
}

#[test]
fn test_html_page_places_legend_column() {
    use crate::{
        event::Category,
        layout::{Grid, RunValue},
    };

    let charts = (0..3)
        .map(|i| ChartPlan::new(Category::Io, i, &format!("copy<{i}>"), vec![RunValue::Missing]))
        .collect::<Vec<_>>();
    let plan = CategoryPlan {
        category: Category::Io,
        grid: Grid::new(3, 2),
        legend: vec!["A & B".to_owned()],
        charts,
    };
    let svgs = vec!["<svg/>".to_owned(); 3];
    let html = html_page(&plan, &svgs, &PlotConfig::default());

    assert!(html.contains("<h1>IO Events</h1>"));
    assert_eq!(html.matches("<tr>").count(), 2);
    assert_eq!(html.matches("<img").count(), 3);
    assert_eq!(html.matches("<ol>").count(), 2);
    assert!(html.contains("<li style='color: green'>A &amp; B"));
    assert!(html.contains("alt='copy<0>'"));
    // The second row holds one chart, then an empty cell, then the legend.
    let second_row = html.split("<tr>").nth(2).unwrap_or_default();
    assert!(second_row.contains("<td>\n<td><ol>"));
}

#[test]
fn test_render_chart() -> eyre::Result<()> {
    use crate::{event::Category, layout::RunValue};

    let chart = ChartPlan::new(
        Category::Kernel,
        2,
        "Surf64",
        vec![RunValue::Present(4.0), RunValue::Missing, RunValue::Present(0.0)],
    );
    let svg = render_chart(&chart, 0.00000001)?;
    assert!(svg.contains("<svg"));
    assert!(svg.contains("Item 2: Surf64"));
    Ok(())
}

#[test]
fn test_render_chart_single_run() -> eyre::Result<()> {
    use crate::{event::Category, layout::RunValue};

    for values in [vec![RunValue::Present(4.0)], vec![RunValue::Missing]] {
        let chart = ChartPlan::new(Category::Io, 0, "Total", values);
        let svg = render_chart(&chart, 0.00000001)?;
        assert!(svg.contains("Item 0: Total"));
    }
    Ok(())
}
