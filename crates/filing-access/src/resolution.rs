//! # Access Resolution
//!
//! The pure decision function that turns a member, an optional override and
//! the rules of a filing cell into one effective access level.
//!
//! Sources are evaluated in a fixed order:
//!
//! 1. No member → `none`
//! 2. Bypass tier (`platform_level <= bypass_max_level`) → `admin`
//! 3. Active, unexpired override → override level, capped by platform role
//! 4. Highest-priority matching active rule → rule level, capped by platform role
//! 5. Otherwise → `none` (default deny)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use filing_org::{Member, PlatformRole};

use crate::level::{cap_for_role, AccessLevel};
use crate::override_grant::AccessOverride;
use crate::rule::AccessRule;

/// Highest platform level that bypasses every rule and override.
pub const DEFAULT_BYPASS_MAX_LEVEL: i32 = 2;

/// Which source decided a resolution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Senior platform tier, full access.
    Bypass,
    /// A per-user override.
    Override,
    /// A rule of the access matrix.
    Rule,
    /// No rule matched.
    Default,
    /// The user is not a member of the organization.
    None,
}

impl ResolutionSource {
    /// Get the string representation of the source.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionSource::Bypass => "bypass",
            ResolutionSource::Override => "override",
            ResolutionSource::Rule => "rule",
            ResolutionSource::Default => "default",
            ResolutionSource::None => "none",
        }
    }
}

/// The effective access of a user on a filing cell. Computed, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResolution {
    /// Effective access level.
    pub effective_access: AccessLevel,
    /// Source that decided the level.
    pub source: ResolutionSource,
    /// Deciding rule, for `source = rule`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<Uuid>,
    /// Deciding override, for `source = override`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_id: Option<Uuid>,
    /// Platform role whose ceiling lowered the granted level.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capped_by: Option<PlatformRole>,
}

impl AccessResolution {
    /// Resolution for a user who is not a member.
    pub fn not_a_member() -> Self {
        Self::plain(AccessLevel::None, ResolutionSource::None)
    }

    /// Resolution when nothing granted access.
    pub fn default_deny() -> Self {
        Self::plain(AccessLevel::None, ResolutionSource::Default)
    }

    /// Resolution for the bypass tier.
    pub fn bypass() -> Self {
        Self::plain(AccessLevel::Admin, ResolutionSource::Bypass)
    }

    fn plain(effective_access: AccessLevel, source: ResolutionSource) -> Self {
        Self {
            effective_access,
            source,
            rule_id: None,
            override_id: None,
            capped_by: None,
        }
    }

    /// Check if the ceiling of the platform role applied.
    pub fn was_capped(&self) -> bool {
        self.capped_by.is_some()
    }

    /// Check if the resolution grants at least `required`.
    pub fn allows(&self, required: AccessLevel) -> bool {
        self.effective_access.allows(required)
    }
}

/// Tunables of the decision function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionPolicy {
    /// Members at or below this platform level bypass rules and overrides.
    pub bypass_max_level: i32,
}

impl Default for ResolutionPolicy {
    fn default() -> Self {
        Self {
            bypass_max_level: DEFAULT_BYPASS_MAX_LEVEL,
        }
    }
}

/// Everything the decision function reads, taken from one consistent snapshot.
#[derive(Debug, Clone)]
pub struct ResolutionInput<'a> {
    /// Filing cell being resolved.
    pub filing_cell_id: Uuid,
    /// Member record, `None` if the user is not a member.
    pub member: Option<&'a Member>,
    /// Candidate override for `(cell, user)`.
    pub active_override: Option<&'a AccessOverride>,
    /// Rules attached to the cell. Inactive and foreign-cell rules are skipped.
    pub rules: &'a [AccessRule],
    /// Reference time for expiry checks.
    pub now: DateTime<Utc>,
}

/// Rule selected by the matrix, with any rules it tied with on priority.
#[derive(Debug, Clone)]
pub struct RuleSelection<'a> {
    /// The winning rule.
    pub rule: &'a AccessRule,
    /// Other matching rules with the same priority, in evaluation order.
    pub tied_with: Vec<Uuid>,
}

/// Pick the matching active rule with the highest priority.
///
/// Candidates are evaluated in a stable order (`created_at`, then `id`) and
/// the first rule reaching the maximum priority wins. Rules sharing that
/// priority are reported in `tied_with`; callers that care about ambiguous
/// policies should give overlapping rules distinct priorities.
pub fn select_rule<'a>(
    rules: &'a [AccessRule],
    filing_cell_id: Uuid,
    member: &Member,
) -> Option<RuleSelection<'a>> {
    let mut candidates: Vec<&AccessRule> = rules
        .iter()
        .filter(|r| r.active && r.filing_cell_id == filing_cell_id && r.matches(member))
        .collect();
    candidates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut best: Option<&AccessRule> = None;
    for rule in candidates.iter().copied() {
        match best {
            Some(current) if rule.priority <= current.priority => {}
            _ => best = Some(rule),
        }
    }

    best.map(|rule| RuleSelection {
        rule,
        tied_with: candidates
            .iter()
            .filter(|r| r.priority == rule.priority && r.id != rule.id)
            .map(|r| r.id)
            .collect(),
    })
}

/// Outcome of [`evaluate`]: the resolution plus diagnostics for logging.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Effective access level and the layer that produced it.
    pub resolution: AccessResolution,
    /// Rules that tied with the winning rule on priority.
    pub tied_rule_ids: Vec<Uuid>,
}

/// Run the precedence chain and keep diagnostics.
pub fn evaluate(input: &ResolutionInput<'_>, policy: &ResolutionPolicy) -> Evaluation {
    let plain = |resolution| Evaluation {
        resolution,
        tied_rule_ids: Vec::new(),
    };

    let Some(member) = input.member else {
        return plain(AccessResolution::not_a_member());
    };

    if member.platform_level <= policy.bypass_max_level {
        return plain(AccessResolution::bypass());
    }

    if let Some(grant) = input.active_override {
        if grant.targets(input.filing_cell_id, &member.user_id) && grant.is_effective(input.now) {
            let (effective, capped) = cap_for_role(grant.access_level, member.platform_role);
            return plain(AccessResolution {
                effective_access: effective,
                source: ResolutionSource::Override,
                rule_id: None,
                override_id: Some(grant.id),
                capped_by: capped.then_some(member.platform_role),
            });
        }
    }

    match select_rule(input.rules, input.filing_cell_id, member) {
        Some(selection) => {
            let (effective, capped) =
                cap_for_role(selection.rule.access_level, member.platform_role);
            Evaluation {
                resolution: AccessResolution {
                    effective_access: effective,
                    source: ResolutionSource::Rule,
                    rule_id: Some(selection.rule.id),
                    override_id: None,
                    capped_by: capped.then_some(member.platform_role),
                },
                tied_rule_ids: selection.tied_with,
            }
        }
        None => plain(AccessResolution::default_deny()),
    }
}

/// Resolve the effective access described by `input`.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use uuid::Uuid;
/// use filing_access::{resolve_access, AccessLevel, AccessRule, ResolutionInput, ResolutionPolicy, ResolutionSource};
/// use filing_org::{Member, PlatformRole};
///
/// let org_id = Uuid::now_v7();
/// let cell = Uuid::now_v7();
/// let member = Member::new(org_id, "u1", PlatformRole::Member);
/// let rules = vec![AccessRule::new(org_id, cell, AccessLevel::Manage)];
///
/// let resolution = resolve_access(
///     &ResolutionInput { filing_cell_id: cell, member: Some(&member), active_override: None, rules: &rules, now: Utc::now() },
///     &ResolutionPolicy::default(),
/// );
/// assert_eq!(resolution.effective_access, AccessLevel::Write);
/// assert_eq!(resolution.source, ResolutionSource::Rule);
/// assert_eq!(resolution.capped_by, Some(PlatformRole::Member));
/// ```
pub fn resolve_access(input: &ResolutionInput<'_>, policy: &ResolutionPolicy) -> AccessResolution {
    evaluate(input, policy).resolution
}
