//! Which decals each connected player should see.
use std::collections::{HashMap, HashSet};

use bevy::prelude::*;

use crate::config::{DecalCatalog, MapDecalsConfig};

use super::{
    controller::DecalLifecycleController,
    host::{BevyDecalHost, DecalHost, PlayerIdentity, PlayerPermissions},
    types::{DecalId, DecalRecord, PlayerId},
};

/// Decides whether `viewer` sees `record`.
///
/// Unconfigured types are hidden. A type's show permission is checked before
/// `force_on_vip`, which overrides the viewer's own preference.
pub fn can_see<H: DecalHost>(
    host: &H,
    viewer: &PlayerId,
    record: &DecalRecord,
    catalog: &DecalCatalog,
    preference: bool,
) -> bool {
    let Some(decal_type) = catalog.get(&record.decal_type_id) else {
        return false;
    };
    if !host.allows(viewer, &decal_type.show_permission) {
        return false;
    }
    if record.force_on_vip {
        return true;
    }
    preference
}

/// Visible decal ids per connected player, rebuilt when the lifecycle changes.
#[derive(Resource, Debug, Default)]
pub struct DecalVisibility {
    visible: HashMap<PlayerId, HashSet<DecalId>>,
}

impl DecalVisibility {
    pub fn is_visible(&self, player: &PlayerId, id: DecalId) -> bool {
        self.visible
            .get(player)
            .is_some_and(|visible| visible.contains(&id))
    }

    pub fn rebuild<H: DecalHost>(
        &mut self,
        players: impl IntoIterator<Item = PlayerId>,
        host: &H,
        controller: &DecalLifecycleController,
        catalog: &DecalCatalog,
    ) {
        self.visible.clear();
        for player in players {
            let preference = controller.preference(&player);
            let visible = controller
                .registry()
                .records()
                .iter()
                .filter(|record| record.is_active)
                .filter(|record| can_see(host, &player, record, catalog, preference))
                .filter_map(|record| record.id)
                .collect();
            self.visible.insert(player, visible);
        }
    }
}

pub fn refresh_decal_visibility(
    controller: Res<DecalLifecycleController>,
    config: Res<MapDecalsConfig>,
    host: BevyDecalHost,
    changed_players: Query<(), Or<(Changed<PlayerIdentity>, Changed<PlayerPermissions>)>>,
    mut departed: RemovedComponents<PlayerIdentity>,
    mut visibility: ResMut<DecalVisibility>,
) {
    let players_left = departed.read().count() > 0;
    if !controller.is_changed() && changed_players.is_empty() && !players_left {
        return;
    }
    visibility.rebuild(host.connected_players(), &host, &controller, &config.catalog);
}
