use std::collections::HashMap;
use std::io;

use macroquad::prelude::*;

use crate::animation::{Animation, Sheet, FRAME_SIZE};
use crate::asset::AssetSource;
use crate::character::Character;
use crate::error::AssetError;
use crate::room::{DrawItem, Room};
use crate::scene::Dialogue;

pub const BUBBLE_TEXTURE: &str = "textures/character/bubble.png";

/// Translation that centres the character's sprite in the window.
pub fn view_offset(window_size: Vec2, char_pos: Vec2) -> Vec2 {
    (window_size / 2.0).floor() - Vec2::splat(FRAME_SIZE / 2.0) - char_pos
}

/// World rect visible under `offset`, as (min, max).
pub fn view_bounds(window_size: Vec2, offset: Vec2) -> (Vec2, Vec2) {
    (-offset, window_size - offset)
}

/// Top-left screen position of a sprite whose bottom-left world corner is
/// `world`. World space is y-up, the screen is y-down.
pub fn world_to_screen(world: Vec2, height: f32, offset: Vec2, window_h: f32) -> Vec2 {
    let s = world + offset;
    vec2(s.x, window_h - s.y - height)
}

/// Textures decoded from the asset source, keyed by logical path.
#[derive(Default)]
pub struct TextureStore {
    textures: HashMap<String, Texture2D>,
}

impl TextureStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, assets: &dyn AssetSource, path: &str) -> Result<&Texture2D, AssetError> {
        if !self.textures.contains_key(path) {
            let bytes = assets.read(path)?;
            let image = Image::from_file_with_format(&bytes, None).map_err(|e| AssetError::Io {
                path: path.to_owned(),
                source: io::Error::new(io::ErrorKind::InvalidData, format!("{e:?}")),
            })?;
            let tex = Texture2D::from_image(&image);
            tex.set_filter(FilterMode::Nearest);
            self.textures.insert(path.to_owned(), tex);
        }
        self.textures
            .get(path)
            .ok_or_else(|| AssetError::NotFound(path.to_owned()))
    }

    /// Loads everything the room and the character will draw.
    pub fn preload(&mut self, assets: &dyn AssetSource, room: &Room) -> Result<(), AssetError> {
        let images = room
            .batches()
            .iter()
            .flat_map(|b| b.tiles.iter())
            .chain(room.special_tiles().iter().map(|s| &s.tile))
            .map(|t| t.image.to_string())
            .collect::<std::collections::BTreeSet<_>>();
        for path in images {
            self.get_or_load(assets, &path)?;
        }
        for sheet in [Sheet::Idle, Sheet::Walk, Sheet::Run, Sheet::Sit] {
            self.get_or_load(assets, &sheet.texture_path())?;
        }
        self.get_or_load(assets, BUBBLE_TEXTURE)?;
        Ok(())
    }

    pub fn get(&self, path: &str) -> Option<&Texture2D> {
        self.textures.get(path)
    }
}

fn draw_frame(tex: &Texture2D, anim: &Animation, world: Vec2, offset: Vec2, window_h: f32) {
    let Some(source) = anim.source_rect() else {
        return;
    };
    let at = world_to_screen(world, source.h, offset, window_h);
    draw_texture_ex(
        tex,
        at.x,
        at.y,
        WHITE,
        DrawTextureParams {
            source: Some(source),
            ..Default::default()
        },
    );
}

fn draw_character(textures: &TextureStore, character: &Character, offset: Vec2, window_h: f32) {
    if let Some(key) = character.animation_key() {
        if let Some(tex) = textures.get(&key.sheet.texture_path()) {
            draw_frame(tex, character.animation(), character.position(), offset, window_h);
        }
    }
    if let (Some(anim), Some(tex)) = (character.bubble_animation(), textures.get(BUBBLE_TEXTURE)) {
        draw_frame(tex, anim, character.bubble_position(), offset, window_h);
    }
}

/// Draws the room around the character. Textures must have been preloaded.
pub fn draw_room(room: &Room, character: &Character, textures: &TextureStore) {
    let window = vec2(screen_width(), screen_height());
    let [r, g, b, a] = room.background();
    clear_background(Color::from_rgba(r, g, b, a));

    let offset = view_offset(window, character.position());
    let (min, max) = view_bounds(window, offset);
    for item in room.draw_list(min, max) {
        match item {
            DrawItem::Tile(tile) => {
                let Some(tex) = textures.get(&tile.image) else {
                    continue;
                };
                let at = world_to_screen(tile.dest, tile.size.y, offset, window.y);
                draw_texture_ex(
                    tex,
                    at.x,
                    at.y,
                    WHITE,
                    DrawTextureParams {
                        source: Some(tile.source),
                        dest_size: Some(tile.size),
                        flip_x: tile.gid.flip_h(),
                        flip_y: tile.gid.flip_v(),
                        ..Default::default()
                    },
                );
            }
            DrawItem::Character => draw_character(textures, character, offset, window.y),
        }
    }
}

/// Plain message strip along the bottom of the window.
pub fn draw_dialogue(dialogue: &Dialogue) {
    let Some(line) = dialogue.current() else {
        return;
    };
    let (w, h) = (screen_width(), screen_height());
    draw_rectangle(16.0, h - 112.0, w - 32.0, 96.0, Color::from_rgba(0, 0, 0, 200));
    draw_text(line, 32.0, h - 64.0, 28.0, WHITE);
}

pub fn draw_key_hint(text: &str) {
    draw_text(text, 16.0, 32.0, 24.0, Color::from_rgba(255, 255, 255, 180));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_is_centred() {
        let window = vec2(768.0, 576.0);
        let char_pos = vec2(100.0, 40.0);
        let offset = view_offset(window, char_pos);
        assert_eq!(offset, vec2(352.0 - 100.0, 256.0 - 40.0));
        let at = world_to_screen(char_pos, FRAME_SIZE, offset, window.y);
        assert_eq!(at, vec2(352.0, 256.0));
    }

    #[test]
    fn view_bounds_cover_the_window() {
        let offset = vec2(10.0, -20.0);
        let (min, max) = view_bounds(vec2(800.0, 600.0), offset);
        assert_eq!(min, vec2(-10.0, 20.0));
        assert_eq!(max - min, vec2(800.0, 600.0));
    }
}
