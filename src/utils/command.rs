//! Command utilities for cross-platform process spawning
//!
//! Used to hand URLs to the desktop's default browser.

use std::process::Command;

/// Creates a Command with platform-specific settings to hide console windows.
///
/// On Windows, this sets the CREATE_NO_WINDOW flag to prevent CMD popups.
/// On other platforms, it returns a standard Command.
pub fn create_command(program: &str) -> Command {
    #[allow(unused_mut)]
    let mut cmd = Command::new(program);

    #[cfg(target_os = "windows")]
    {
        use std::os::windows::process::CommandExt;
        // CREATE_NO_WINDOW = 0x08000000
        cmd.creation_flags(0x08000000);
    }

    cmd
}

/// Command that opens `url` in the default browser
pub fn browser_command(url: &str) -> Command {
    #[cfg(target_os = "windows")]
    {
        let mut cmd = create_command("cmd");
        // The empty argument is the window title `start` expects first
        cmd.args(["/c", "start", "", url]);
        cmd
    }

    #[cfg(target_os = "macos")]
    {
        let mut cmd = create_command("open");
        cmd.arg(url);
        cmd
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let mut cmd = create_command("xdg-open");
        cmd.arg(url);
        cmd
    }
}
