//! Text menu model. Rendering is left to the host; selections come back as
//! [`DecalMenuSelected`](super::events::DecalMenuSelected) messages.
use crate::config::DecalCatalog;

use super::types::{DecalDimension, DecalId, DecalRecord};

/// Navigation or lifecycle request attached to a menu option.
#[derive(Debug, Clone, PartialEq)]
pub enum DecalMenuAction {
    OpenMainMenu,
    OpenPlaceMenu,
    OpenEditList,
    OpenEditDecal(DecalId),
    SelectDecalType(String),
    Reposition(DecalId),
    OpenDimension(DecalId, DecalDimension),
    SetDimension(DecalId, DecalDimension, f32),
    ToggleForceOnVip(DecalId),
    ToggleActive(DecalId),
    Delete(DecalId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecalMenuOption {
    pub label: String,
    pub action: DecalMenuAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecalMenu {
    pub title: String,
    pub options: Vec<DecalMenuOption>,
}

impl DecalMenu {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            options: Vec::new(),
        }
    }

    fn option(mut self, label: impl Into<String>, action: DecalMenuAction) -> Self {
        self.options.push(DecalMenuOption {
            label: label.into(),
            action,
        });
        self
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.options.iter().map(|option| option.label.as_str())
    }
}

pub fn main_menu() -> DecalMenu {
    DecalMenu::new("Map Decals Menu")
        .option("Place New Decal", DecalMenuAction::OpenPlaceMenu)
        .option("Edit Existing Decals", DecalMenuAction::OpenEditList)
}

/// Decal types the player may see, followed by a back option.
pub fn place_menu(catalog: &DecalCatalog, can_see: impl Fn(&str) -> bool) -> DecalMenu {
    catalog
        .iter()
        .filter(|decal_type| {
            decal_type.show_permission.is_empty() || can_see(decal_type.show_permission.as_str())
        })
        .fold(DecalMenu::new("Select Decal to Place"), |menu, decal_type| {
            menu.option(
                decal_type.name.clone(),
                DecalMenuAction::SelectDecalType(decal_type.id.clone()),
            )
        })
        .option("Back", DecalMenuAction::OpenMainMenu)
}

/// `None` when the map has no decals yet.
pub fn edit_list_menu(records: &[DecalRecord]) -> Option<DecalMenu> {
    if records.is_empty() {
        return None;
    }

    let menu = records
        .iter()
        .filter_map(|record| record.id.map(|id| (id, record)))
        .fold(DecalMenu::new("Edit Decals"), |menu, (id, record)| {
            let status = if record.is_active { "[Active]" } else { "[Disabled]" };
            menu.option(
                format!("{} {}", record.name, status),
                DecalMenuAction::OpenEditDecal(id),
            )
        })
        .option("Back", DecalMenuAction::OpenMainMenu);
    Some(menu)
}

pub fn edit_menu(id: DecalId, record: &DecalRecord) -> DecalMenu {
    let force_label = if record.force_on_vip {
        "Force on VIP: ON"
    } else {
        "Force on VIP: OFF"
    };
    let active_label = if record.is_active {
        "Disable Decal"
    } else {
        "Enable Decal"
    };

    DecalMenu::new(format!("Edit: {}", record.name))
        .option("Reposition", DecalMenuAction::Reposition(id))
        .option(
            "Adjust Width",
            DecalMenuAction::OpenDimension(id, DecalDimension::Width),
        )
        .option(
            "Adjust Height",
            DecalMenuAction::OpenDimension(id, DecalDimension::Height),
        )
        .option(
            "Adjust Depth",
            DecalMenuAction::OpenDimension(id, DecalDimension::Depth),
        )
        .option(force_label, DecalMenuAction::ToggleForceOnVip(id))
        .option(active_label, DecalMenuAction::ToggleActive(id))
        .option("Delete Decal", DecalMenuAction::Delete(id))
        .option("Back", DecalMenuAction::OpenEditList)
}

pub fn dimension_menu(id: DecalId, dimension: DecalDimension) -> DecalMenu {
    let title = match dimension {
        DecalDimension::Width => "Adjust Width",
        DecalDimension::Height => "Adjust Height",
        DecalDimension::Depth => "Adjust Depth",
    };

    dimension
        .presets()
        .iter()
        .fold(DecalMenu::new(title), |menu, &preset| {
            menu.option(
                preset.to_string(),
                DecalMenuAction::SetDimension(id, dimension, preset),
            )
        })
        .option("Back", DecalMenuAction::OpenEditDecal(id))
}
