//! The fixed placeholder vocabulary.
//!
//! Each [`MarkerKind`] owns one placeholder literal that appears in source
//! files while the release is unknown, and one replacement template that
//! receives the release version once it is known.

use serde::Serialize;
use std::fmt;

/// Placeholder in a template that receives the release version.
const VERSION_SLOT: &str = "{version}";

/// Kind of pending annotation. Declaration order is the tiebreak for
/// several markers sharing one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkerKind {
    /// `@since TODO`
    Introduced,
    /// `@Deprecated(since = "TODO")`
    Deprecated,
    /// `@RestrictedSince("TODO")`
    Restricted,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 3] = [
        MarkerKind::Introduced,
        MarkerKind::Deprecated,
        MarkerKind::Restricted,
    ];

    pub fn marker(self) -> &'static Marker {
        match self {
            MarkerKind::Introduced => &MARKERS[0],
            MarkerKind::Deprecated => &MARKERS[1],
            MarkerKind::Restricted => &MARKERS[2],
        }
    }

    pub fn placeholder(self) -> &'static str {
        self.marker().placeholder
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MarkerKind::Introduced => "introduction-pending",
            MarkerKind::Deprecated => "deprecation-version-pending",
            MarkerKind::Restricted => "restriction-version-pending",
        };
        f.write_str(name)
    }
}

static MARKERS: [Marker; 3] = [
    Marker {
        kind: MarkerKind::Introduced,
        placeholder: "@since TODO",
        template: "@since {version}",
    },
    Marker {
        kind: MarkerKind::Deprecated,
        placeholder: r#"@Deprecated(since = "TODO")"#,
        template: r#"@Deprecated(since = "{version}")"#,
    },
    Marker {
        kind: MarkerKind::Restricted,
        placeholder: r#"@RestrictedSince("TODO")"#,
        template: r#"@RestrictedSince("{version}")"#,
    },
];

/// A placeholder literal together with the template that replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub placeholder: &'static str,
    template: &'static str,
}

impl Marker {
    /// The whole vocabulary, in declaration order.
    pub fn all() -> &'static [Marker; 3] {
        &MARKERS
    }

    /// Render the replacement literal for a concrete release version.
    ///
    /// ```
    /// use since_resolver::marker::MarkerKind;
    ///
    /// let marker = MarkerKind::Deprecated.marker();
    /// assert_eq!(marker.render("2.345"), r#"@Deprecated(since = "2.345")"#);
    /// ```
    pub fn render(&self, version: &str) -> String {
        self.template.replacen(VERSION_SLOT, version, 1)
    }

    /// Kinds whose placeholder occurs in `text`, in declaration order.
    pub fn kinds_in(text: &str) -> impl Iterator<Item = MarkerKind> + '_ {
        MARKERS
            .iter()
            .filter(move |marker| text.contains(marker.placeholder))
            .map(|marker| marker.kind)
    }

    /// All placeholder literals, in declaration order.
    pub fn placeholders() -> [&'static str; 3] {
        MARKERS.map(|marker| marker.placeholder)
    }
}

/// Strip the release tag prefix, giving the version written into sources.
///
/// A tag that does not carry the prefix is returned unchanged.
pub fn release_version<'a>(tag_name: &'a str, prefix: &str) -> &'a str {
    tag_name.strip_prefix(prefix).unwrap_or(tag_name)
}
