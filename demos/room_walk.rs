use std::path::Path;

use anyhow::Context;
use macroquad::prelude::*;
use mystery::cache::ResourceCache;
use mystery::input::{Bindings, InputEvent};
use mystery::locale::{StringTable, Translate};
use mystery::render::draw::{draw_dialogue, draw_key_hint, draw_room, TextureStore};
use mystery::{crash, logging, DirAssets, GameScene, RoomRegistry, SceneAction, Settings};
use tracing::{error, info, warn};

const ASSETS: &str = "assets";
const START_ROOM: &str = "start";

fn window_conf() -> Conf {
    Conf {
        window_title: "Room Walk".into(),
        window_width: 768,
        window_height: 576,
        window_resizable: false,
        ..Default::default()
    }
}

fn poll_input(bindings: &Bindings) -> Vec<InputEvent> {
    let mut events = Vec::new();
    for code in bindings.codes() {
        let Some(key) = bindings.get(code) else {
            continue;
        };
        if is_key_pressed(code) {
            events.push(InputEvent::Pressed(key));
        }
        if is_key_released(code) {
            events.push(InputEvent::Released(key));
        }
    }
    events
}

async fn run() -> anyhow::Result<()> {
    let settings = Settings::load(Path::new(".")).context("reading settings")?;
    let assets = DirAssets::new(ASSETS);
    let strings = StringTable::load(&assets, &settings.lang);
    let registry = RoomRegistry::from_assets(&assets, "rooms.json").context("reading room table")?;
    let mut scene = GameScene::new(ResourceCache::new(Box::new(assets), strings), registry);
    scene.enter_scene(START_ROOM)?;

    let bindings = Bindings::default();
    let mut textures = TextureStore::new();
    let mut preloaded: Option<String> = None;
    let mut pending = Vec::new();
    let tick = settings.tick_interval();
    let mut bank = 0.0;
    info!(fps = settings.fps, lang = %scene.cache().strings().code(), "Starting");

    loop {
        // Fixed-rate ticks; input waits for the next tick when a frame runs none.
        pending.extend(poll_input(&bindings));
        bank += get_frame_time();
        while bank >= tick {
            bank -= tick;
            if scene.frame(&pending, tick)? == SceneAction::Quit {
                scene.leave_scene();
                return Ok(());
            }
            pending.clear();
        }

        let Some(room) = scene.current_room() else {
            next_frame().await;
            continue;
        };
        if preloaded.as_deref() != Some(room.key()) {
            if let Err(e) = textures.preload(scene.cache().assets(), room) {
                warn!(room = room.key(), error = %e, "Some textures could not be loaded");
            }
            preloaded = Some(room.key().to_owned());
        }

        draw_room(room, scene.character(), &textures);
        if let Some(dialogue) = scene.dialogue() {
            draw_dialogue(dialogue);
        } else if room.hint_visible() {
            draw_key_hint(&scene.cache().translate("hint.interact"));
        }
        next_frame().await;
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    logging::init();
    crash::install_panic_hook("crash-reports");
    if let Err(e) = run().await {
        error!(error = ?e, "Room walk stopped");
    }
}
