//! Application menu: a static description plus the dispatcher that turns an
//! activated item into a page command or a window operation.

#[cfg(feature = "desktop")]
pub mod native;

use crate::window::{WindowFactory, WindowManager, WindowOp};

/// Parameterless signal for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    ImportData,
    ExportResults,
    StartAnalysis,
    StopAnalysis,
    About,
}

impl MenuCommand {
    pub const ALL: [MenuCommand; 5] = [
        MenuCommand::ImportData,
        MenuCommand::ExportResults,
        MenuCommand::StartAnalysis,
        MenuCommand::StopAnalysis,
        MenuCommand::About,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MenuCommand::ImportData => "import-data",
            MenuCommand::ExportResults => "export-results",
            MenuCommand::StartAnalysis => "start-analysis",
            MenuCommand::StopAnalysis => "stop-analysis",
            MenuCommand::About => "about",
        }
    }

    /// Event name the page listens on.
    pub fn channel(self) -> &'static str {
        match self {
            MenuCommand::ImportData => "menu-import-data",
            MenuCommand::ExportResults => "menu-export-results",
            MenuCommand::StartAnalysis => "menu-start-analysis",
            MenuCommand::StopAnalysis => "menu-stop-analysis",
            MenuCommand::About => "menu-about",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Command(MenuCommand),
    Window(WindowOp),
    Quit,
}

const WINDOW_ACTIONS: [(WindowOp, &str); 6] = [
    (WindowOp::Reload, "reload"),
    (WindowOp::ForceReload, "force-reload"),
    (WindowOp::ToggleDevTools, "toggle-devtools"),
    (WindowOp::ResetZoom, "actual-size"),
    (WindowOp::ZoomIn, "zoom-in"),
    (WindowOp::ZoomOut, "zoom-out"),
];

impl MenuAction {
    /// Stable menu item id.
    pub fn id(self) -> &'static str {
        match self {
            MenuAction::Command(command) => command.name(),
            MenuAction::Window(op) => WINDOW_ACTIONS
                .iter()
                .find(|(candidate, _)| *candidate == op)
                .map(|(_, id)| *id)
                .unwrap_or("window"),
            MenuAction::Quit => "quit",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        if id == "quit" {
            return Some(MenuAction::Quit);
        }
        if let Some(command) = MenuCommand::ALL.iter().find(|c| c.name() == id) {
            return Some(MenuAction::Command(*command));
        }
        WINDOW_ACTIONS
            .iter()
            .find(|(_, candidate)| *candidate == id)
            .map(|(op, _)| MenuAction::Window(*op))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    Item {
        label: &'static str,
        accelerator: Option<&'static str>,
        action: MenuAction,
    },
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuGroup {
    pub label: &'static str,
    pub entries: Vec<MenuEntry>,
}

fn item(label: &'static str, accelerator: Option<&'static str>, action: MenuAction) -> MenuEntry {
    MenuEntry::Item {
        label,
        accelerator,
        action,
    }
}

/// The whole menu, declared once.
pub fn application_menu() -> Vec<MenuGroup> {
    use MenuAction::{Command, Quit, Window};

    vec![
        MenuGroup {
            label: "File",
            entries: vec![
                item("Import Signal Data", Some("CmdOrCtrl+O"), Command(MenuCommand::ImportData)),
                item("Export Analysis Results", Some("CmdOrCtrl+S"), Command(MenuCommand::ExportResults)),
                MenuEntry::Separator,
                item("Quit", Some("CmdOrCtrl+Q"), Quit),
            ],
        },
        MenuGroup {
            label: "Analysis",
            entries: vec![
                item("Start Signal Analysis", Some("CmdOrCtrl+Enter"), Command(MenuCommand::StartAnalysis)),
                item("Stop Analysis", Some("CmdOrCtrl+T"), Command(MenuCommand::StopAnalysis)),
            ],
        },
        MenuGroup {
            label: "View",
            entries: vec![
                item("Reload", Some("CmdOrCtrl+R"), Window(WindowOp::Reload)),
                item("Force Reload", Some("CmdOrCtrl+Shift+R"), Window(WindowOp::ForceReload)),
                item("Developer Tools", Some("F12"), Window(WindowOp::ToggleDevTools)),
                MenuEntry::Separator,
                item("Actual Size", Some("CmdOrCtrl+0"), Window(WindowOp::ResetZoom)),
                item("Zoom In", Some("CmdOrCtrl+="), Window(WindowOp::ZoomIn)),
                item("Zoom Out", Some("CmdOrCtrl+-"), Window(WindowOp::ZoomOut)),
            ],
        },
        MenuGroup {
            label: "Help",
            entries: vec![item("About", None, Command(MenuCommand::About))],
        },
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent(MenuCommand),
    /// No window to receive the command.
    Dropped(MenuCommand),
    Applied(WindowOp),
    Ignored(WindowOp),
    /// The caller must terminate the application.
    Quit,
}

/// Installs the menu once per run and routes activations.
#[derive(Debug, Default)]
pub struct MenuDispatcher {
    installed: bool,
}

impl MenuDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the menu to `installer` unless that already happened this run.
    pub fn install<I>(&mut self, installer: I) -> Result<bool, String>
    where
        I: FnOnce(&[MenuGroup]) -> Result<(), String>,
    {
        if self.installed {
            return Ok(false);
        }
        installer(&application_menu())?;
        self.installed = true;
        log::info!("[Menu] Application menu installed");
        Ok(true)
    }

    pub fn dispatch<F: WindowFactory>(
        &self,
        action: MenuAction,
        windows: &mut WindowManager<F>,
    ) -> DispatchOutcome {
        log::debug!("[Menu] Activated {}", action.id());
        match action {
            MenuAction::Command(command) => {
                if windows.send(command.channel()) {
                    DispatchOutcome::Sent(command)
                } else {
                    DispatchOutcome::Dropped(command)
                }
            }
            MenuAction::Window(op) => {
                if windows.apply(op) {
                    DispatchOutcome::Applied(op)
                } else {
                    DispatchOutcome::Ignored(op)
                }
            }
            MenuAction::Quit => DispatchOutcome::Quit,
        }
    }
}
