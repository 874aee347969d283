//! Desktop stand-in for the page host: logs element changes and keeps the
//! injected stylesheet on disk when asked to.

use clouds::EffectHost;
use std::path::PathBuf;

pub struct DesktopHost {
    stylesheet: Option<PathBuf>,
    written: bool,
}

impl DesktopHost {
    /// `stylesheet` receives every injected rule set, replacing the file on first write.
    pub fn new(stylesheet: Option<PathBuf>) -> Self {
        Self {
            stylesheet,
            written: false,
        }
    }
}

impl EffectHost for DesktopHost {
    fn attach_surface(&mut self, class: &str) -> bool {
        log::debug!("Attached element .{}", class);
        true
    }

    fn inject_styles(&mut self, css: &str) {
        log::debug!("Injected {} bytes of styles", css.len());
        let Some(path) = &self.stylesheet else {
            return;
        };
        let result = if self.written {
            std::fs::read_to_string(path).and_then(|prev| std::fs::write(path, prev + css))
        } else {
            std::fs::write(path, css)
        };
        match result {
            Ok(()) => self.written = true,
            Err(e) => log::warn!("Could not write stylesheet to {:?}: {}", path, e),
        }
    }

    fn detach_surface(&mut self, class: &str) {
        log::debug!("Detached element .{}", class);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_accumulate_in_file() {
        let path = std::env::temp_dir().join(format!("neo-clouds-host-{}.css", std::process::id()));
        let mut host = DesktopHost::new(Some(path.clone()));
        assert!(host.attach_surface("a"));
        host.inject_styles("a {}\n");
        host.inject_styles("b {}\n");
        host.detach_surface("a");

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "a {}\nb {}\n");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn no_path_writes_nothing() {
        let mut host = DesktopHost::new(None);
        host.inject_styles("a {}");
        assert!(!host.written);
    }
}
