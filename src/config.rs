//! Configuration surface for the inline pass.
//!
//! The engine's configuration loading lives upstream; this crate only
//! recognizes the options that change inline resolution. Defaults follow
//! the engine's GFM posture: both extensions on.

/// Recognized inline options.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Config {
    /// GFM autolinking: bare `www.`/`http://`/`https://`/`ftp://` URLs and
    /// bare email addresses become links without angle brackets.
    pub gfm_auto_link: bool,
    /// GFM strikethrough: `~` runs participate in delimiter resolution.
    pub gfm_strikethrough: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            gfm_auto_link: true,
            gfm_strikethrough: true,
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }
}

/// Builder for [`Config`].
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder {
    gfm_auto_link: Option<bool>,
    gfm_strikethrough: Option<bool>,
}

impl ConfigBuilder {
    pub fn gfm_auto_link(mut self, enabled: bool) -> Self {
        self.gfm_auto_link = Some(enabled);
        self
    }

    pub fn gfm_strikethrough(mut self, enabled: bool) -> Self {
        self.gfm_strikethrough = Some(enabled);
        self
    }

    pub fn build(self) -> Config {
        let defaults = Config::default();
        Config {
            gfm_auto_link: self.gfm_auto_link.unwrap_or(defaults.gfm_auto_link),
            gfm_strikethrough: self
                .gfm_strikethrough
                .unwrap_or(defaults.gfm_strikethrough),
        }
    }
}
