// ─── Rule Evaluation ───
// OS / architecture / feature conditions gating libraries and argument tokens.

use std::collections::HashMap;

use serde::Deserialize;

/// Operating system families as named by Mojang manifests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsFamily {
    Windows,
    Osx,
    Linux,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            OsFamily::Windows
        } else if cfg!(target_os = "macos") {
            OsFamily::Osx
        } else {
            OsFamily::Linux
        }
    }

    pub fn mojang_name(self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Osx => "osx",
            OsFamily::Linux => "linux",
        }
    }

    /// Java classpath / library path separator.
    pub fn path_separator(self) -> &'static str {
        match self {
            OsFamily::Windows => ";",
            OsFamily::Osx | OsFamily::Linux => ":",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86,
    X86_64,
    Arm64,
}

impl Arch {
    pub fn current() -> Self {
        if cfg!(target_arch = "x86") {
            Arch::X86
        } else if cfg!(target_arch = "aarch64") {
            Arch::Arm64
        } else {
            Arch::X86_64
        }
    }

    pub fn mojang_name(self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Arm64 => "arm64",
        }
    }

    /// Value substituted for `${arch}` in native classifier templates.
    pub fn bits(self) -> &'static str {
        match self {
            Arch::X86 => "32",
            Arch::X86_64 | Arch::Arm64 => "64",
        }
    }
}

/// Target of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: OsFamily,
    pub arch: Arch,
}

impl Platform {
    pub fn current() -> Self {
        Self {
            os: OsFamily::current(),
            arch: Arch::current(),
        }
    }

    pub fn new(os: OsFamily, arch: Arch) -> Self {
        Self { os, arch }
    }
}

/// Launcher features a rule may require (`features` block of a rule).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureSet {
    pub is_demo_user: bool,
    pub has_custom_resolution: bool,
}

impl FeatureSet {
    fn get(&self, name: &str) -> bool {
        match name {
            "is_demo_user" => self.is_demo_user,
            "has_custom_resolution" => self.has_custom_resolution,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    /// Pattern over the OS release string. The host release is never
    /// probed, so a rule carrying one does not match.
    #[serde(default)]
    pub version: Option<String>,
}

impl Rule {
    pub fn allow() -> Self {
        Self {
            action: RuleAction::Allow,
            os: None,
            features: None,
        }
    }

    pub fn disallow() -> Self {
        Self {
            action: RuleAction::Disallow,
            os: None,
            features: None,
        }
    }

    pub fn for_os(mut self, os: OsFamily) -> Self {
        self.os = Some(OsRule {
            name: Some(os.mojang_name().to_string()),
            arch: None,
            version: None,
        });
        self
    }

    /// Whether every constraint of this rule holds for the target.
    /// A rule without constraints applies everywhere.
    ///
    /// An `os.version` constraint cannot be confirmed for a [`Platform`], so
    /// the rule is treated as not matching: version-gated argument tokens
    /// (`-Dos.name=Windows 10`) are dropped, and version-gated library
    /// exclusions fall through to the remaining rules.
    pub fn matches(&self, platform: &Platform, features: &FeatureSet) -> bool {
        if let Some(os) = &self.os {
            if os.version.is_some() {
                return false;
            }
            if os
                .name
                .as_deref()
                .is_some_and(|name| name != platform.os.mojang_name())
            {
                return false;
            }
            if os
                .arch
                .as_deref()
                .is_some_and(|arch| arch != platform.arch.mojang_name())
            {
                return false;
            }
        }

        match &self.features {
            Some(required) => required
                .iter()
                .all(|(name, wanted)| features.get(name) == *wanted),
            None => true,
        }
    }
}

/// Last matching rule's verdict, or `None` when nothing matched.
fn last_match(rules: &[Rule], platform: &Platform, features: &FeatureSet) -> Option<bool> {
    rules
        .iter()
        .rev()
        .find(|rule| rule.matches(platform, features))
        .map(|rule| rule.action == RuleAction::Allow)
}

/// Library filter. Opt-out: a library is kept unless its rules exclude the
/// platform.
///
/// No rules ⇒ included. Otherwise the last matching rule decides. When no
/// rule matches, the library is excluded only if the list declares an
/// `allow` rule (an allow-list that did not name this platform).
///
/// This default differs from [`argument_included`] on purpose: manifests
/// rely on `[{disallow, os}]` keeping the library for every other OS.
pub fn library_included(rules: &[Rule], platform: &Platform) -> bool {
    if rules.is_empty() {
        return true;
    }

    last_match(rules, platform, &FeatureSet::default()).unwrap_or_else(|| {
        !rules
            .iter()
            .any(|rule| rule.action == RuleAction::Allow)
    })
}

/// Conditional argument filter. Opt-in: the token is kept only when the last
/// matching rule allows it. No match ⇒ dropped.
pub fn argument_included(rules: &[Rule], platform: &Platform, features: &FeatureSet) -> bool {
    if rules.is_empty() {
        return true;
    }

    last_match(rules, platform, features).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINUX: Platform = Platform {
        os: OsFamily::Linux,
        arch: Arch::X86_64,
    };
    const WINDOWS: Platform = Platform {
        os: OsFamily::Windows,
        arch: Arch::X86_64,
    };
    const OSX: Platform = Platform {
        os: OsFamily::Osx,
        arch: Arch::Arm64,
    };

    #[test]
    fn no_rules_means_allowed() {
        assert!(library_included(&[], &LINUX));
        assert!(argument_included(&[], &LINUX, &FeatureSet::default()));
    }

    #[test]
    fn allow_for_one_os_is_symmetric() {
        let rules = vec![Rule::allow().for_os(OsFamily::Windows)];
        assert!(library_included(&rules, &WINDOWS));
        assert!(!library_included(&rules, &LINUX));
        assert!(argument_included(&rules, &WINDOWS, &FeatureSet::default()));
        assert!(!argument_included(&rules, &LINUX, &FeatureSet::default()));
    }

    #[test]
    fn disallow_for_other_os_differs_between_libraries_and_arguments() {
        let rules = vec![Rule::disallow().for_os(OsFamily::Osx)];
        // Libraries are opt-out, arguments are opt-in.
        assert!(library_included(&rules, &LINUX));
        assert!(!argument_included(&rules, &LINUX, &FeatureSet::default()));
        assert!(!library_included(&rules, &OSX));
    }

    #[test]
    fn last_matching_rule_wins() {
        let rules = vec![Rule::allow(), Rule::disallow().for_os(OsFamily::Osx)];
        assert!(library_included(&rules, &LINUX));
        assert!(library_included(&rules, &WINDOWS));
        assert!(!library_included(&rules, &OSX));
    }

    #[test]
    fn arch_constraint_is_checked() {
        let rules: Vec<Rule> = serde_json::from_value(serde_json::json!([
            {"action": "allow"},
            {"action": "disallow", "os": {"arch": "x86"}}
        ]))
        .unwrap();
        let x86 = Platform::new(OsFamily::Windows, Arch::X86);
        assert!(library_included(&rules, &WINDOWS));
        assert!(!library_included(&rules, &x86));
    }

    #[test]
    fn os_version_constraints_never_match() {
        let win10_args: Vec<Rule> = serde_json::from_value(serde_json::json!([
            {"action": "allow", "os": {"name": "windows", "version": "^10\\."}}
        ]))
        .unwrap();
        assert!(!argument_included(&win10_args, &WINDOWS, &FeatureSet::default()));

        let old_osx_excluded: Vec<Rule> = serde_json::from_value(serde_json::json!([
            {"action": "allow"},
            {"action": "disallow", "os": {"name": "osx", "version": "^10\\.5\\.\\d$"}}
        ]))
        .unwrap();
        assert!(library_included(&old_osx_excluded, &OSX));
        assert!(library_included(&old_osx_excluded, &LINUX));
    }

    #[test]
    fn feature_rules_follow_feature_set() {
        let rules: Vec<Rule> = serde_json::from_value(serde_json::json!([
            {"action": "allow", "features": {"is_demo_user": true}}
        ]))
        .unwrap();
        assert!(!argument_included(&rules, &LINUX, &FeatureSet::default()));
        let demo = FeatureSet {
            is_demo_user: true,
            ..FeatureSet::default()
        };
        assert!(argument_included(&rules, &LINUX, &demo));
    }

    #[test]
    fn evaluation_is_pure() {
        let rules = vec![
            Rule::allow().for_os(OsFamily::Linux),
            Rule::disallow().for_os(OsFamily::Windows),
        ];
        for platform in [LINUX, WINDOWS, OSX] {
            let first = library_included(&rules, &platform);
            let first_arg = argument_included(&rules, &platform, &FeatureSet::default());
            for _ in 0..8 {
                assert_eq!(library_included(&rules, &platform), first);
                assert_eq!(
                    argument_included(&rules, &platform, &FeatureSet::default()),
                    first_arg
                );
            }
        }
    }

    #[test]
    fn separator_is_semicolon_only_on_windows() {
        assert_eq!(OsFamily::Windows.path_separator(), ";");
        assert_eq!(OsFamily::Linux.path_separator(), ":");
        assert_eq!(OsFamily::Osx.path_separator(), ":");
    }
}
