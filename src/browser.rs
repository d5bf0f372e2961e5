//! Opens report links (log files, freshports pages) in the system browser.
//!
//! Compile-time detection for Windows and macOS, then runtime detection for
//! WSL2, which builds as `target_os = "linux"` but needs `wslview`.

use color_eyre::eyre::{eyre, Result};
use std::process::{Command, Stdio};

pub fn open_in_browser(url: &str) -> Result<()> {
    // Only http(s); anything else could be a local file or another protocol handler.
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(eyre!("Refusing to open non-HTTP URL: {url}"));
    }
    tracing::debug!(url, "opening in browser");

    if cfg!(target_os = "windows") {
        // The empty "" title keeps the URL from being read as the window title.
        return Command::new("cmd")
            .args(["/C", "start", "", url])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| eyre!("Failed to open browser: {e}"));
    }

    let wsl = std::env::var_os("WSL_DISTRO_NAME").is_some();
    let cmd = if cfg!(target_os = "macos") {
        "open"
    } else if wsl {
        "wslview"
    } else {
        "xdg-open"
    };

    match Command::new(cmd)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => return Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(eyre!("Failed to open browser with {cmd}: {e}")),
    }

    if wsl {
        return Command::new("cmd.exe")
            .args(["/C", "start", "", url])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| eyre!("Failed to open browser via cmd.exe: {e}"));
    }

    Err(eyre!(
        "No browser opener found. On WSL install wslu; on Linux install xdg-utils."
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_non_http_urls() {
        assert!(open_in_browser("file:///etc/passwd").is_err());
        assert!(open_in_browser("../www___nginx.log").is_err());
    }
}
