use typed_builder::TypedBuilder;

/// What happens to sprite pixels that fall past the right or bottom edge.
///
/// The sprite origin always wraps onto the screen; this only governs the
/// pixels that extend beyond it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpriteEdge {
    /// Off-screen pixels are dropped and never collide.
    #[default]
    Clip,
    /// Off-screen pixels wrap around to the opposite edge.
    Wrap,
}

/// Compatibility switches for behaviour that differs between interpreters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TypedBuilder)]
pub struct Quirks {
    #[builder(default)]
    pub sprite_edge: SpriteEdge,
    /// Treat `0NNN` machine-code calls as no-ops instead of failing.
    #[builder(default = false)]
    pub ignore_sys_calls: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Quirks::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_clip_and_reject_sys() {
        let quirks = Quirks::default();
        assert_eq!(quirks.sprite_edge, SpriteEdge::Clip);
        assert!(!quirks.ignore_sys_calls);
    }

    #[test]
    fn builder_overrides() {
        let quirks = Quirks::builder()
            .sprite_edge(SpriteEdge::Wrap)
            .ignore_sys_calls(true)
            .build();
        assert_eq!(quirks.sprite_edge, SpriteEdge::Wrap);
        assert!(quirks.ignore_sys_calls);
    }
}
