//! Version-gated client fixes.
//!
//! A [`FixRegistry`] records which behavioural patches apply to which range of
//! negotiated versions. [`FixCoordinator`] listens for lifecycle events and
//! asks the host to refresh caches whose contents depend on those patches.

use std::{fmt, sync::Arc};

use crate::{
    executor::MainContext,
    lifecycle::LifecycleObserver,
    version::{ProtocolVersion, VersionCell},
};

/// Behavioural patches the client applies for older revisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientFix {
    /// Item stacks may carry zero or negative counts.
    NegativeItemCount,
    /// The armour bar is ticked client-side.
    ArmorHudEmulation,
    /// Footstep particles are spawned client-side.
    FootstepParticle,
    /// Entity bounding boxes use their historical dimensions.
    EntityDimensions,
    /// Item selection uses the classic grid screen.
    ClassicItemGrid,
    /// Classic protocol extensions adjust mappings and limits.
    ClassicExtensions,
}

/// Inclusive range of protocol versions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VersionRange {
    /// Every version up to and including the bound.
    AtMost(ProtocolVersion),
    /// Every version from the bound onwards.
    AtLeast(ProtocolVersion),
    /// Every version between the bounds, inclusive.
    Between(ProtocolVersion, ProtocolVersion),
    /// A single version.
    Exactly(ProtocolVersion),
}

impl VersionRange {
    /// Whether `version` falls within the range.
    #[must_use]
    pub fn contains(&self, version: ProtocolVersion) -> bool {
        match *self {
            Self::AtMost(bound) => version <= bound,
            Self::AtLeast(bound) => version >= bound,
            Self::Between(low, high) => low <= version && version <= high,
            Self::Exactly(bound) => version == bound,
        }
    }
}

/// Table of fixes and the versions they apply to.
#[derive(Clone, Debug, Default)]
pub struct FixRegistry {
    entries: Vec<(ClientFix, VersionRange)>,
}

impl FixRegistry {
    /// Registry carrying the built-in fix table.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::default();
        registry.register(
            ClientFix::NegativeItemCount,
            VersionRange::AtMost(ProtocolVersion::R1_10),
        );
        registry.register(
            ClientFix::ArmorHudEmulation,
            VersionRange::AtMost(ProtocolVersion::R1_8),
        );
        registry.register(
            ClientFix::FootstepParticle,
            VersionRange::AtMost(ProtocolVersion::R1_12_2),
        );
        registry.register(
            ClientFix::EntityDimensions,
            VersionRange::AtMost(ProtocolVersion::R1_17),
        );
        registry.register(
            ClientFix::ClassicItemGrid,
            VersionRange::AtMost(ProtocolVersion::C0_28_TO_C0_30),
        );
        registry.register(
            ClientFix::ClassicExtensions,
            VersionRange::AtMost(ProtocolVersion::C0_28_TO_C0_30),
        );
        registry
    }

    /// Register `fix` for `range`, replacing any earlier range for the fix.
    pub fn register(&mut self, fix: ClientFix, range: VersionRange) {
        if let Some(entry) = self.entries.iter_mut().find(|(known, _)| *known == fix) {
            entry.1 = range;
        } else {
            self.entries.push((fix, range));
        }
    }

    /// Whether `fix` applies to `version`. Unregistered fixes never apply.
    #[must_use]
    pub fn is_active(&self, fix: ClientFix, version: ProtocolVersion) -> bool {
        self.entries
            .iter()
            .any(|(known, range)| *known == fix && range.contains(version))
    }

    /// Every fix that applies to `version`, in registration order.
    #[must_use]
    pub fn active(&self, version: ProtocolVersion) -> Vec<ClientFix> {
        self.entries
            .iter()
            .filter(|(_, range)| range.contains(version))
            .map(|(fix, _)| *fix)
            .collect()
    }
}

/// Host subsystems refreshed when the negotiated version changes.
///
/// Every method runs on the main loop.
pub trait ClientReloadHooks: Send + Sync {
    /// Drop cached glyphs so text is re-rendered with the new font rules.
    fn clear_font_caches(&self);

    /// Rebuild collision shapes of blocks whose geometry is patched.
    fn rebuild_shape_caches(&self);

    /// Discard the classic item selection grid so it is rebuilt on next use.
    fn reset_item_grid(&self);

    /// The host finished loading; `fixes` are those active right now.
    fn on_game_loaded(&self, _fixes: &[ClientFix]) {}
}

/// Lifecycle observer that keeps host caches in step with the active fixes.
pub struct FixCoordinator {
    registry: FixRegistry,
    hooks: Arc<dyn ClientReloadHooks>,
    main: Arc<dyn MainContext>,
    current: Arc<VersionCell>,
}

impl FixCoordinator {
    /// Create a coordinator.
    ///
    /// `current` is read when the game finishes loading to decide which fixes
    /// to report.
    #[must_use]
    pub fn new(
        registry: FixRegistry,
        hooks: Arc<dyn ClientReloadHooks>,
        main: Arc<dyn MainContext>,
        current: Arc<VersionCell>,
    ) -> Self {
        Self {
            registry,
            hooks,
            main,
            current,
        }
    }

    /// Registry consulted by this coordinator.
    #[must_use]
    pub fn registry(&self) -> &FixRegistry { &self.registry }
}

impl LifecycleObserver for FixCoordinator {
    fn on_version_changed(&self, _old: ProtocolVersion, new: ProtocolVersion) {
        let hooks = Arc::clone(&self.hooks);
        let reset_grid = self.registry.is_active(ClientFix::ClassicItemGrid, new);
        self.main.execute(Box::new(move || {
            hooks.clear_font_caches();
            hooks.rebuild_shape_caches();
            if reset_grid {
                hooks.reset_item_grid();
            }
        }));
    }

    fn on_game_loaded(&self) {
        let fixes = self.registry.active(self.current.get());
        self.hooks.on_game_loaded(&fixes);
    }
}

impl fmt::Debug for FixCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixCoordinator")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(ClientFix::NegativeItemCount, ProtocolVersion::R1_10, true)]
    #[case(ClientFix::NegativeItemCount, ProtocolVersion::R1_11, false)]
    #[case(ClientFix::ArmorHudEmulation, ProtocolVersion::R1_8, true)]
    #[case(ClientFix::ArmorHudEmulation, ProtocolVersion::R1_9_3, false)]
    #[case(ClientFix::ClassicItemGrid, ProtocolVersion::C0_28_TO_C0_30, true)]
    #[case(ClientFix::ClassicItemGrid, ProtocolVersion::R1_8, false)]
    #[case(ClientFix::EntityDimensions, ProtocolVersion::BEDROCK_LATEST, false)]
    fn builtin_gates(
        #[case] fix: ClientFix,
        #[case] version: ProtocolVersion,
        #[case] expected: bool,
    ) {
        assert_eq!(FixRegistry::builtin().is_active(fix, version), expected);
    }

    #[test]
    fn register_replaces_existing_range() {
        let mut registry = FixRegistry::builtin();
        registry.register(
            ClientFix::NegativeItemCount,
            VersionRange::Exactly(ProtocolVersion::R1_12_2),
        );
        assert!(!registry.is_active(ClientFix::NegativeItemCount, ProtocolVersion::R1_10));
        assert!(registry.is_active(ClientFix::NegativeItemCount, ProtocolVersion::R1_12_2));
    }

    #[test]
    fn newest_release_has_no_fixes() {
        assert!(FixRegistry::builtin().active(ProtocolVersion::R1_20_5).is_empty());
    }

    #[test]
    fn between_is_inclusive() {
        let range = VersionRange::Between(ProtocolVersion::R1_8, ProtocolVersion::R1_10);
        assert!(range.contains(ProtocolVersion::R1_8));
        assert!(range.contains(ProtocolVersion::R1_10));
        assert!(!range.contains(ProtocolVersion::R1_11));
    }
}
