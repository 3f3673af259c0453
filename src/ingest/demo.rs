//! Synthetic posts used when live search is unavailable or disabled.
//! Everything produced here is tagged `Provenance::Demo`.

use crate::ingest::types::Post;

/// Upper bound on a synthetic batch, whatever the caller asked for.
pub const DEMO_BATCH_CAP: usize = 10;

const DEMO_TEMPLATES: &[(&str, &str)] = &[
    ("demo-1", "{q} looks strong today. Momentum building."),
    ("demo-2", "Mixed feelings on {q}; waiting for clarity."),
    ("demo-3", "Bearish take on {q} - recent news spooked me."),
    ("demo-4", "I'm cautiously optimistic about {q}."),
    ("demo-5", "Hype around {q} is overblown, IMO."),
];

/// Canned sentences with the query interpolated, truncated to `k`.
pub fn demo_posts(query: &str, k: usize) -> Vec<Post> {
    DEMO_TEMPLATES
        .iter()
        .take(k.min(DEMO_BATCH_CAP))
        .map(|(id, tpl)| Post::new(*id, tpl.replace("{q}", query)))
        .collect()
}
