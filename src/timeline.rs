use std::{collections::BTreeMap, fs::File, io::Read};

use jane_eyre::eyre::{self, bail, Context};
use poloto::ticks::{
    tick_fmt::TickFmt, IndexRequester, RenderFrameBound, TickDistGen, TickDistribution, TickRes,
};
use tracing::{debug, info};

/// Every command of one kernel, from a `Category,Name,CallNo,Enqueue,Submit,Start,End` profile.
#[derive(Debug, Default, PartialEq)]
pub struct KernelTimeline {
    pub name: String,
    pub enqueues: Vec<u64>,
    pub submits: Vec<u64>,
    pub starts: Vec<u64>,
    pub ends: Vec<u64>,
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Enqueue,
    Submit,
    Start,
    End,
}

impl Phase {
    const ALL: [Phase; 4] = [Phase::Enqueue, Phase::Submit, Phase::Start, Phase::End];

    fn times(self, kernel: &KernelTimeline) -> &[u64] {
        match self {
            Phase::Enqueue => &kernel.enqueues,
            Phase::Submit => &kernel.submits,
            Phase::Start => &kernel.starts,
            Phase::End => &kernel.ends,
        }
    }

    /// Vertical offset from the kernel's row, so that markers for each phase do not overlap.
    fn offset(self) -> f64 {
        match self {
            Phase::Enqueue => -0.3,
            Phase::Submit => -0.1,
            Phase::Start => 0.1,
            Phase::End => 0.3,
        }
    }
}

impl KernelTimeline {
    pub fn first_enqueue(&self) -> Option<u64> {
        self.enqueues.iter().copied().min()
    }

    pub fn last_end(&self) -> Option<u64> {
        self.ends.iter().copied().max()
    }
}

#[tracing::instrument(level = "error")]
pub fn load_profile(path: &str) -> eyre::Result<Vec<KernelTimeline>> {
    info!("Parsing profile");

    let mut text = String::default();
    File::open(path)?.read_to_string(&mut text)?;

    parse_profile(&text).wrap_err_with(|| format!("Failed to parse {path}"))
}

/// Groups profile rows by kernel name, ordered by each kernel's first enqueue. The first line is
/// a header.
pub fn parse_profile(text: &str) -> eyre::Result<Vec<KernelTimeline>> {
    let mut order = vec![];
    let mut kernels: BTreeMap<String, KernelTimeline> = BTreeMap::default();

    for (i, line) in text.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = line.split(',').map(str::trim).collect::<Vec<_>>();
        let [_category, name, _call, enqueue, submit, start, end, ..] = fields[..] else {
            bail!("Line {}: expected 7 fields, found {}", i + 1, fields.len());
        };
        let timestamp = |field: &str| -> eyre::Result<u64> {
            field
                .parse()
                .wrap_err_with(|| format!("Line {}: bad timestamp {field:?}", i + 1))
        };

        let kernel = kernels.entry(name.to_owned()).or_insert_with(|| {
            order.push(name.to_owned());
            KernelTimeline {
                name: name.to_owned(),
                ..Default::default()
            }
        });
        kernel.enqueues.push(timestamp(enqueue)?);
        kernel.submits.push(timestamp(submit)?);
        kernel.starts.push(timestamp(start)?);
        kernel.ends.push(timestamp(end)?);
    }

    let mut result = order
        .iter()
        .filter_map(|name| kernels.remove(name))
        .collect::<Vec<_>>();
    result.sort_by_key(|k| k.first_enqueue());
    for kernel in &result {
        debug!(
            name = %kernel.name,
            commands = kernel.enqueues.len(),
            first_enqueue = kernel.first_enqueue(),
            last_end = kernel.last_end(),
            "Kernel"
        );
    }

    Ok(result)
}

/// One row per kernel, labelled with its name, plus an unlabelled tick on each side.
struct KernelTicks(Vec<String>);
struct KernelFmt(Vec<String>);
impl TickFmt<f64> for KernelFmt {
    fn write_tick(&self, writer: &mut dyn std::fmt::Write, x: &f64) -> std::fmt::Result {
        let label = usize::try_from(x.round() as i128)
            .ok()
            .and_then(|i| self.0.get(i));
        write!(writer, "{}", label.map_or("", |s| s.as_str()))
    }
}
impl TickDistGen<f64> for KernelTicks {
    type Res = TickDistribution<Vec<f64>, KernelFmt>;
    fn generate(
        self,
        _: &poloto::ticks::DataBound<f64>,
        _: &RenderFrameBound,
        _: IndexRequester,
    ) -> Self::Res {
        TickDistribution {
            res: TickRes { dash_size: None },
            iter: (-1..=self.0.len() as i64).map(|i| i as f64).collect(),
            fmt: KernelFmt(self.0),
        }
    }
}

/// Renders each kernel as a span from first enqueue to last end, with a marker series per
/// command phase. Times are relative to the earliest enqueue.
pub fn render_timeline(kernels: &[KernelTimeline]) -> eyre::Result<String> {
    let Some(origin) = kernels.iter().filter_map(|k| k.first_enqueue()).min() else {
        bail!("No commands in profile");
    };
    let end = kernels
        .iter()
        .filter_map(|k| k.last_end())
        .max()
        .unwrap_or(origin);
    let relative = |t: u64| t.saturating_sub(origin) as f64;

    let spans = kernels.iter().enumerate().map(|(row, k)| {
        let y = row as f64;
        let from = k.first_enqueue().map_or(0.0, relative);
        let to = k.last_end().map_or(from, relative);
        poloto::build::plot(k.name.clone()).line([(from, y), (to, y)])
    });
    let markers = Phase::ALL.into_iter().map(|phase| {
        let points = kernels
            .iter()
            .enumerate()
            .flat_map(|(row, k)| {
                phase
                    .times(k)
                    .iter()
                    .map(move |&t| (t, row as f64 + phase.offset()))
            })
            .map(|(t, y)| (relative(t), y))
            .collect::<Vec<_>>();
        poloto::build::plot(format!("{phase:?}")).scatter(points)
    });
    let names = kernels.iter().map(|k| k.name.clone()).collect::<Vec<_>>();
    // Leave 4% on the right so the last markers are not clipped.
    let width = relative(end) * 1.04;

    let svg = poloto::frame_build()
        .data(poloto::plots!(
            poloto::build::markers([0f64, width], [-1f64, kernels.len() as f64]),
            spans,
            markers
        ))
        .map_yticks(|_| KernelTicks(names.clone()))
        .build_and_label(("Kernel execution flow", "time", "kernel"))
        .append_to(poloto::header().light_theme())
        .render_string()?;

    Ok(svg)
}

#[test]
fn test_parse_profile() -> eyre::Result<()> {
    let kernels = parse_profile(
        "Category,KernelName,CallNo,Enqueue,Submit,Start,End\n\
         Kernel,Transpose,0,300,310,320,400\n\
         Kernel,Scan,0,100,110,120,200\n\
         Kernel,Transpose,1,150,160,170,500\n\
         \n",
    )?;
    let names = kernels.iter().map(|k| &*k.name).collect::<Vec<_>>();
    assert_eq!(names, ["Scan", "Transpose"]);
    assert_eq!(kernels[1].enqueues, [300, 150]);
    assert_eq!(kernels[1].first_enqueue(), Some(150));
    assert_eq!(kernels[1].last_end(), Some(500));

    assert!(parse_profile("header\nKernel,Scan,0,1,2\n").is_err());
    assert!(parse_profile("header\nKernel,Scan,0,1,2,three,4\n").is_err());
    Ok(())
}

#[test]
fn test_render_timeline() -> eyre::Result<()> {
    let kernels = parse_profile("header\nKernel,Scan,0,100,110,120,200\n")?;
    let svg = render_timeline(&kernels)?;
    assert!(svg.contains("<svg"));
    assert!(render_timeline(&[]).is_err());
    Ok(())
}

#[test]
fn test_render_timeline_rows() -> eyre::Result<()> {
    let kernels = parse_profile(
        "header\n\
         Kernel,Transpose,0,300,310,320,400\n\
         Kernel,Scan,0,100,110,120,200\n",
    )?;
    let svg = render_timeline(&kernels)?;
    assert!(svg.contains("Scan"));
    assert!(svg.contains("Transpose"));
    Ok(())
}
