//! Static named-entity lookup table.
//!
//! Construction of the full HTML5 reference list is the embedding engine's
//! concern; the inline pass consumes it as a read-only lookup. The table
//! here covers the names that dominate real documents and serves as the
//! semicolon-optional fast path; everything else goes through the general
//! decoder in the entity resolver. Keys carry neither `&` nor `;`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static ENTITIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("AMP", "&"),
        ("amp", "&"),
        ("LT", "<"),
        ("lt", "<"),
        ("GT", ">"),
        ("gt", ">"),
        ("QUOT", "\""),
        ("quot", "\""),
        ("apos", "'"),
        ("nbsp", "\u{a0}"),
        ("copy", "\u{a9}"),
        ("COPY", "\u{a9}"),
        ("reg", "\u{ae}"),
        ("REG", "\u{ae}"),
        ("trade", "\u{2122}"),
        ("deg", "\u{b0}"),
        ("plusmn", "\u{b1}"),
        ("frac12", "\u{bd}"),
        ("frac14", "\u{bc}"),
        ("frac34", "\u{be}"),
        ("times", "\u{d7}"),
        ("divide", "\u{f7}"),
        ("sect", "\u{a7}"),
        ("para", "\u{b6}"),
        ("middot", "\u{b7}"),
        ("laquo", "\u{ab}"),
        ("raquo", "\u{bb}"),
        ("hellip", "\u{2026}"),
        ("ndash", "\u{2013}"),
        ("mdash", "\u{2014}"),
        ("lsquo", "\u{2018}"),
        ("rsquo", "\u{2019}"),
        ("ldquo", "\u{201c}"),
        ("rdquo", "\u{201d}"),
        ("bull", "\u{2022}"),
        ("dagger", "\u{2020}"),
        ("Dagger", "\u{2021}"),
        ("prime", "\u{2032}"),
        ("Prime", "\u{2033}"),
        ("larr", "\u{2190}"),
        ("uarr", "\u{2191}"),
        ("rarr", "\u{2192}"),
        ("darr", "\u{2193}"),
        ("harr", "\u{2194}"),
        ("eacute", "\u{e9}"),
        ("egrave", "\u{e8}"),
        ("agrave", "\u{e0}"),
        ("ccedil", "\u{e7}"),
        ("ouml", "\u{f6}"),
        ("uuml", "\u{fc}"),
        ("auml", "\u{e4}"),
        ("szlig", "\u{df}"),
        ("euro", "\u{20ac}"),
        ("pound", "\u{a3}"),
        ("yen", "\u{a5}"),
        ("cent", "\u{a2}"),
    ])
});

/// Look up a named entity. `name` carries neither `&` nor `;`.
pub fn lookup(name: &str) -> Option<&'static str> {
    ENTITIES.get(name).copied()
}
