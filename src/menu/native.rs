use tauri::menu::{Menu, MenuItem, PredefinedMenuItem, Submenu};
use tauri::AppHandle;

use super::{MenuEntry, MenuGroup};

/// Turn the menu description into the native application menu.
pub fn install(app: &AppHandle, groups: &[MenuGroup]) -> tauri::Result<()> {
    let menu = Menu::new(app)?;
    for group in groups {
        let submenu = Submenu::new(app, group.label, true)?;
        for entry in &group.entries {
            match entry {
                MenuEntry::Item {
                    label,
                    accelerator,
                    action,
                } => {
                    let item = MenuItem::with_id(app, action.id(), *label, true, *accelerator)?;
                    submenu.append(&item)?;
                }
                MenuEntry::Separator => {
                    submenu.append(&PredefinedMenuItem::separator(app)?)?;
                }
            }
        }
        menu.append(&submenu)?;
    }
    // Application-wide, so windows recreated later pick it up as well.
    app.set_menu(menu)?;
    Ok(())
}
