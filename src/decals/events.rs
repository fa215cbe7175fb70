//! Messages exchanged with the host game.
use bevy::prelude::*;

use super::{
    menu::{DecalMenu, DecalMenuAction},
    types::PlayerId,
};

/// A new round began; engine-side entities may have been reset.
#[derive(Message, Debug, Clone)]
pub struct RoundStarted;

/// The host loaded a new map.
#[derive(Message, Debug, Clone)]
pub struct MapChanged {
    pub map_name: String,
}

/// A player finished connecting.
#[derive(Message, Debug, Clone)]
pub struct PlayerConnected {
    pub player: PlayerId,
    pub is_bot: bool,
}

/// A player left the server.
#[derive(Message, Debug, Clone)]
pub struct PlayerDisconnected {
    pub player: PlayerId,
}

/// A player marked a world location with the ping key.
#[derive(Message, Debug, Clone)]
pub struct PlayerPinged {
    pub player: PlayerId,
    pub position: Vec3,
}

/// A chat or console command typed by a player, without arguments.
#[derive(Message, Debug, Clone)]
pub struct PlayerChatCommand {
    pub player: PlayerId,
    pub command: String,
}

/// The player picked an option from a menu this plugin opened.
#[derive(Message, Debug, Clone)]
pub struct DecalMenuSelected {
    pub player: PlayerId,
    pub action: DecalMenuAction,
}

/// Chat line the host should print to one player.
#[derive(Message, Debug, Clone, PartialEq)]
pub struct DecalChatMessage {
    pub player: PlayerId,
    pub text: String,
}

/// Menu the host should render for one player.
#[derive(Message, Debug, Clone)]
pub struct OpenDecalMenu {
    pub player: PlayerId,
    pub menu: DecalMenu,
}
