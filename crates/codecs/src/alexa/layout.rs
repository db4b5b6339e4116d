use std::path::PathBuf;

/// Where interaction models live inside the skill directory. The ask
/// command-line tool moved them between major versions.
pub trait SkillLayout: Send + Sync {
    fn name(&self) -> &'static str;
    fn models_dir(&self) -> PathBuf;

    fn model_path(&self, locale: &str) -> PathBuf {
        self.models_dir().join(format!("{locale}.json"))
    }
}

/// ask-cli 1.x: `models/<locale>.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyLayout;

impl SkillLayout for LegacyLayout {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn models_dir(&self) -> PathBuf {
        PathBuf::from("models")
    }
}

/// ask-cli 2.x and later: `skill-package/interactionModels/custom/<locale>.json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SkillPackageLayout;

impl SkillLayout for SkillPackageLayout {
    fn name(&self) -> &'static str {
        "skill-package"
    }

    fn models_dir(&self) -> PathBuf {
        PathBuf::from("skill-package")
            .join("interactionModels")
            .join("custom")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct AskToolVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl AskToolVersion {
    /// Parses output such as `2.22.4` or `v1.7.23`.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw
            .trim()
            .trim_start_matches('v')
            .split(|ch: char| ch == '.' || ch == '-')
            .map(|part| part.parse::<u32>());

        let major = parts.next()?.ok()?;
        let minor = parts.next().and_then(Result::ok).unwrap_or(0);
        let patch = parts.next().and_then(Result::ok).unwrap_or(0);
        Some(Self {
            major,
            minor,
            patch,
        })
    }

    pub fn uses_skill_package(self) -> bool {
        self.major >= 2
    }
}

/// What already exists in the skill directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct LayoutProbe {
    pub has_skill_package: bool,
    pub has_legacy_models: bool,
}

/// Picks the layout from the tool version when known, otherwise from the
/// directories already on disk. New projects get the current layout.
pub fn detect_layout(version: Option<&str>, probe: LayoutProbe) -> Box<dyn SkillLayout> {
    match version.and_then(AskToolVersion::parse) {
        Some(version) if version.uses_skill_package() => Box::new(SkillPackageLayout),
        Some(_) => Box::new(LegacyLayout),
        None if !probe.has_skill_package && probe.has_legacy_models => Box::new(LegacyLayout),
        None => Box::new(SkillPackageLayout),
    }
}
