//! Plain-text report built by `portaria doctor`.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Fail,
    Skip,
    Info,
}

impl CheckStatus {
    const fn marker(self) -> &'static str {
        match self {
            Self::Pass => "✓",
            Self::Fail => "✗",
            Self::Skip => "-",
            Self::Info => "•",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub status: CheckStatus,
    pub details: Vec<String>,
}

impl Check {
    fn new(status: CheckStatus, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            details: Vec::new(),
        }
    }

    pub fn pass(name: impl Into<String>) -> Self {
        Self::new(CheckStatus::Pass, name)
    }

    pub fn fail(name: impl Into<String>) -> Self {
        Self::new(CheckStatus::Fail, name)
    }

    pub fn skip(name: impl Into<String>) -> Self {
        Self::new(CheckStatus::Skip, name)
    }

    pub fn info(name: impl Into<String>) -> Self {
        Self::new(CheckStatus::Info, name)
    }

    #[must_use]
    pub fn detail(mut self, line: impl Into<String>) -> Self {
        self.details.push(line.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub checks: Vec<Check>,
}

impl Section {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            checks: Vec::new(),
        }
    }

    pub fn push(&mut self, check: Check) {
        self.checks.push(check);
    }

    #[must_use]
    pub fn passed(&self, name: &str) -> bool {
        self.checks
            .iter()
            .any(|check| check.name == name && check.status == CheckStatus::Pass)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    pub fn push(&mut self, section: Section) {
        self.sections.push(section);
    }

    pub fn checks(&self) -> impl Iterator<Item = &Check> {
        self.sections.iter().flat_map(|section| section.checks.iter())
    }

    #[must_use]
    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks().filter(|check| check.status == status).count()
    }

    #[must_use]
    pub fn section(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.title == title)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== PORTARIA DOCTOR ===")?;
        for (index, section) in self.sections.iter().enumerate() {
            writeln!(f)?;
            writeln!(f, "{}. {}", index + 1, section.title.to_uppercase())?;
            writeln!(f, "-------------------------------------------")?;
            for check in &section.checks {
                writeln!(f, "{} {}", check.status.marker(), check.name)?;
                for line in &check.details {
                    writeln!(f, "  {line}")?;
                }
            }
        }
        writeln!(f)?;
        writeln!(
            f,
            "=== {} passed, {} failed, {} skipped ===",
            self.count(CheckStatus::Pass),
            self.count(CheckStatus::Fail),
            self.count(CheckStatus::Skip)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Report {
        let mut paths = Section::new("Paths");
        paths.push(Check::pass("logs").detail("/var/log/app"));
        paths.push(Check::fail("config"));
        let mut auth = Section::new("Auth");
        auth.push(Check::skip("token round-trip"));
        let mut report = Report::default();
        report.push(paths);
        report.push(auth);
        report
    }

    #[test]
    fn counts_by_status() {
        let report = sample();
        assert_eq!(report.count(CheckStatus::Pass), 1);
        assert_eq!(report.count(CheckStatus::Fail), 1);
        assert_eq!(report.count(CheckStatus::Skip), 1);
        assert_eq!(report.count(CheckStatus::Info), 0);
    }

    #[test]
    fn renders_numbered_sections_and_markers() {
        let rendered = sample().to_string();
        assert!(rendered.contains("1. PATHS"));
        assert!(rendered.contains("2. AUTH"));
        assert!(rendered.contains("✓ logs\n  /var/log/app"));
        assert!(rendered.contains("✗ config"));
        assert!(rendered.contains("- token round-trip"));
        assert!(rendered.contains("1 passed, 1 failed, 1 skipped"));
    }

    #[test]
    fn section_lookup() {
        let report = sample();
        let paths = report.section("Paths");
        assert!(paths.is_some_and(|section| section.passed("logs")));
        assert!(paths.is_some_and(|section| !section.passed("config")));
        assert!(report.section("Missing").is_none());
    }
}
