// Packaging tool invocation
pub mod tool {
    pub const DEFAULT_TOOL: &str = "pyinstaller";

    pub const ONEFILE_FLAG: &str = "--onefile";
    pub const WINDOWED_FLAG: &str = "--windowed";
    pub const ICON_FLAG: &str = "--icon";
    pub const NOCONFIRM_FLAG: &str = "--noconfirm";

    // Where the tool writes its bundled executable, relative to the project dir
    pub const DIST_DIR: &str = "dist";
}

// Target defaults
pub mod defaults {
    pub const TARGET: &str = "main";
    pub const MAIN_SCRIPT: &str = "main.py";
    pub const CAPTURE_APP_SCRIPT: &str = "capture_app.py";
    pub const CAPTURE_APP_ICON: &str = "icon.ico";

    pub const PRESET_FILE_NAME: &str = ".build-presets.json";

    pub const SCRIPT_EXTENSIONS: &[&str] = &["py", "pyw"];
}

// Console text
pub mod messages {
    pub const SUCCESS_BANNER: &str = "Build complete!";
    pub const FAILURE_BANNER: &str = "Build failed!";
    pub const PAUSE_PROMPT: &str = "Press any key to continue . . .";
}

// Process exit codes
pub mod exit {
    pub const SUCCESS: u8 = 0;
    pub const BUILD_FAILED: u8 = 1;
    pub const PRECONDITION_FAILED: u8 = 2;
}
