use camino::{Utf8Path, Utf8PathBuf};

macro_rules! define_paths {
    ($name:ident { $($field:ident : $default:expr),* $(,)? }) => {
        #[derive(Clone, Debug)]
        pub struct $name {
            $(pub $field: Utf8PathBuf,)*
        }

        impl $name {
            pub fn to_absolute(mut self, base: &Utf8Path) -> Self {
                $(self.$field = base.join(self.$field);)*
                self
            }

            pub fn new(base: &Utf8Path) -> Self {
                Self::default().to_absolute(base)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($field: $default.into(),)*
                }
            }
        }
    };
}

define_paths!(DataPathRules {
    downloads: "Mods",
    staging: "Staging",
    profiles: "profiles.toml",
    settings: "mod_settings.toml",
    logs: "logs",
});

define_paths!(GamePathRules {
    install: "Paks",
});

/// Absolute locations the library works with.
#[derive(Clone, Debug)]
pub struct StorePaths {
    /// Disabled packages and every non-installed version.
    pub downloads: Utf8PathBuf,
    /// Packages the game loads.
    pub install: Utf8PathBuf,
    pub staging: Utf8PathBuf,
    pub profiles: Utf8PathBuf,
    pub settings: Utf8PathBuf,
}

impl StorePaths {
    pub fn new(data_root: &Utf8Path, game_root: &Utf8Path) -> Self {
        let data = DataPathRules::new(data_root);
        let game = GamePathRules::new(game_root);
        Self {
            downloads: data.downloads,
            install: game.install,
            staging: data.staging,
            profiles: data.profiles,
            settings: data.settings,
        }
    }

    pub fn dirs(&self) -> [&Utf8PathBuf; 3] {
        [&self.downloads, &self.install, &self.staging]
    }
}
