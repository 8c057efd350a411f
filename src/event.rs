use std::{collections::BTreeMap, fmt::Display, path::Path, str::FromStr};

use serde::Serialize;

pub static TOTAL_NAME: &str = "Total";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Category {
    Kernel,
    #[serde(rename = "IO")]
    Io,
    Compile,
    User,
}

impl Category {
    /// Charting order.
    pub const ALL: [Category; 4] = [
        Category::Kernel,
        Category::User,
        Category::Io,
        Category::Compile,
    ];

    pub fn tag(&self) -> &'static str {
        match self {
            Category::Kernel => "Kernel",
            Category::Io => "IO",
            Category::Compile => "Compile",
            Category::User => "User",
        }
    }

    pub fn title(&self) -> String {
        format!("{} Events", self.tag())
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "Kernel" => Ok(Category::Kernel),
            "IO" => Ok(Category::Io),
            "Compile" => Ok(Category::Compile),
            "User" => Ok(Category::User),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub category: Category,
    pub name: String,
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RunInfo {
    pub description: String,
}

/// Everything parsed out of one trace file.
#[derive(Clone, Debug)]
pub struct EventGroup {
    pub path: String,
    pub info: Option<RunInfo>,
    /// `Info` lines after the first, kept for `dump` only.
    pub extra_info: Vec<RunInfo>,
    events: BTreeMap<Category, Vec<Event>>,
    totals_appended: bool,
}

impl Event {
    pub fn new(category: Category, name: impl Into<String>, duration: f64) -> Self {
        Self {
            category,
            name: name.into(),
            duration,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}: {}", self.category, self.name, self.duration)
    }
}

impl EventGroup {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            info: None,
            extra_info: vec![],
            events: Category::ALL.iter().map(|&c| (c, vec![])).collect(),
            totals_appended: false,
        }
    }

    /// First `Info` line wins; later ones go to `extra_info`.
    pub fn push_info(&mut self, description: impl Into<String>) {
        let info = RunInfo {
            description: description.into(),
        };
        if self.info.is_none() {
            self.info = Some(info);
        } else {
            self.extra_info.push(info);
        }
    }

    pub fn push(&mut self, event: Event) {
        self.events.entry(event.category).or_default().push(event);
    }

    pub fn events(&self, category: Category) -> &[Event] {
        self.events.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first event named `name`, if any.
    pub fn find(&self, category: Category, name: &str) -> Option<&Event> {
        self.events(category).iter().find(|e| e.name == name)
    }

    /// Legend label: the run description, or the file name if the trace had no `Info` line.
    pub fn description(&self) -> &str {
        match &self.info {
            Some(info) if !info.description.is_empty() => &info.description,
            _ => Path::new(&self.path)
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or(&self.path),
        }
    }

    /// Appends one synthetic `Total` event per category. Only the first call has any effect.
    pub fn append_totals(&mut self) {
        if self.totals_appended {
            return;
        }
        for (&category, events) in self.events.iter_mut() {
            let sum = events.iter().map(|e| e.duration).sum::<f64>();
            events.push(Event::new(category, TOTAL_NAME, sum));
        }
        self.totals_appended = true;
    }
}

#[test]
fn test_append_totals_is_idempotent() {
    let mut group = EventGroup::new("a.surflog");
    group.push(Event::new(Category::Kernel, "A", 10.0));
    group.push(Event::new(Category::Kernel, "B", 5.0));
    group.append_totals();
    group.append_totals();
    assert_eq!(
        group.events(Category::Kernel),
        [
            Event::new(Category::Kernel, "A", 10.0),
            Event::new(Category::Kernel, "B", 5.0),
            Event::new(Category::Kernel, "Total", 15.0),
        ]
    );
    assert_eq!(
        group.events(Category::Io),
        [Event::new(Category::Io, "Total", 0.0)]
    );
}

#[test]
fn test_first_info_wins() {
    let mut group = EventGroup::new("traces/b.surflog");
    assert_eq!(group.description(), "b.surflog");
    group.push_info("Tesla C2050");
    group.push_info("Host gpu01");
    assert_eq!(group.description(), "Tesla C2050");
    assert_eq!(group.extra_info.len(), 1);
}

#[test]
fn test_category_tags() {
    for category in Category::ALL {
        assert_eq!(category.tag().parse::<Category>(), Ok(category));
    }
    assert_eq!("Io".parse::<Category>(), Err(()));
}
