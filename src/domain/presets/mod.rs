mod cornell_box;
mod empty_sky;
mod mirror_sphere_on_plane;

use crate::domain::Scene;

pub const SCENE_IDS: [&str; 3] = [
    empty_sky::SCENE_ID,
    cornell_box::SCENE_ID,
    mirror_sphere_on_plane::SCENE_ID,
];

pub fn build_scene(scene_id: &str) -> Result<Scene, String> {
    if scene_id.eq_ignore_ascii_case(empty_sky::SCENE_ID) {
        return Ok(empty_sky::build());
    }
    if scene_id.eq_ignore_ascii_case(cornell_box::SCENE_ID) {
        return Ok(cornell_box::build());
    }
    if scene_id.eq_ignore_ascii_case(mirror_sphere_on_plane::SCENE_ID) {
        return Ok(mirror_sphere_on_plane::build());
    }

    Err(format!("unknown scene identifier: {scene_id}"))
}
