#![warn(missing_docs)]
//! Hex map editor.
//!
//! Opens one map from the local backend and edits it in an egui canvas.
//! Tab toggles the world inspector, Esc quits.

use bevy::app::AppExit;
use bevy::prelude::*;
#[cfg(feature = "native")]
use bevy::remote::{RemotePlugin, http::RemoteHttpPlugin};
use bevy_egui::EguiPlugin;
use bevy_inspector_egui::quick::WorldInspectorPlugin;

use hex_map_editor::EditorState;
use hex_map_editor::editor::{EditorPlugin, PendingPrompt};
use hex_map_editor::map::MapPlugin;
use hex_map_editor::persistence::PersistencePlugin;
use hex_map_editor::render::{RenderConfig, RenderPlugin};

#[cfg(feature = "native")]
mod cli {
    use std::path::PathBuf;

    use clap::Parser;
    use hex_map_editor::editor::EditorConfig;
    use hex_map_editor::persistence::PersistenceConfig;

    /// Command line overrides for the default configuration.
    #[derive(Parser, Debug)]
    #[command(version, about = "Hex map editor")]
    struct Cli {
        /// Map to open.
        #[arg(long)]
        map_id: Option<i64>,
        /// JSON data file of the local backend.
        #[arg(long)]
        data: Option<PathBuf>,
        /// Start with hex coordinates shown.
        #[arg(long)]
        coordinates: bool,
    }

    pub fn configure() -> (PersistenceConfig, EditorConfig) {
        let cli = Cli::parse();
        let mut persistence = PersistenceConfig::default();
        let mut editor = EditorConfig::default();
        if let Some(id) = cli.map_id {
            persistence.map_id = id;
        }
        if let Some(path) = cli.data {
            persistence.data_path = Some(path);
        }
        editor.show_coordinates |= cli.coordinates;
        (persistence, editor)
    }
}

#[cfg(not(feature = "native"))]
mod cli {
    use hex_map_editor::editor::EditorConfig;
    use hex_map_editor::persistence::PersistenceConfig;

    pub fn configure() -> (PersistenceConfig, EditorConfig) {
        (PersistenceConfig::default(), EditorConfig::default())
    }
}

fn main() {
    let (persistence, editor) = cli::configure();

    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "Hex Map Editor".into(),
            ..default()
        }),
        ..default()
    }))
    .register_type::<EditorState>()
    .init_state::<EditorState>()
    .add_plugins(EguiPlugin::default())
    .add_plugins(MapPlugin)
    .add_plugins(PersistencePlugin(persistence))
    .add_plugins(RenderPlugin(RenderConfig::default()))
    .add_plugins(EditorPlugin(editor))
    .add_systems(Startup, spawn_camera)
    .add_systems(Update, exit_on_esc)
    .add_systems(Update, toggle_inspector)
    .add_plugins(WorldInspectorPlugin::new().run_if(in_state(EditorState::Debugging)));

    #[cfg(feature = "native")]
    app.add_plugins(RemotePlugin::default())
        .add_plugins(RemoteHttpPlugin::default());

    app.run();
}

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn toggle_inspector(
    keys: Res<ButtonInput<KeyCode>>,
    state: Res<State<EditorState>>,
    prompt: Res<PendingPrompt>,
    mut next: ResMut<NextState<EditorState>>,
) {
    if !keys.just_pressed(KeyCode::Tab) || prompt.prompt.is_some() {
        return;
    }
    match state.get() {
        EditorState::Editing => next.set(EditorState::Debugging),
        EditorState::Debugging => next.set(EditorState::Editing),
        _ => {}
    }
}

/// Esc quits, unless it is closing the marker name prompt.
fn exit_on_esc(
    keys: Res<ButtonInput<KeyCode>>,
    prompt: Res<PendingPrompt>,
    mut exit: MessageWriter<AppExit>,
) {
    if keys.just_pressed(KeyCode::Escape) && prompt.prompt.is_none() {
        exit.write(AppExit::Success);
    }
}
