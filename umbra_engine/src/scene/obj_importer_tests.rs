/// Tests for ObjImporter

use super::*;
use std::fs;
use std::path::PathBuf;

/// Write `files` into a fresh temp directory and return it
fn write_model(dir_name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("umbra_obj_{}_{}", dir_name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    for (name, contents) in files {
        fs::write(dir.join(name), contents).unwrap();
    }
    dir
}

const QUAD_OBJ: &str = "\
mtllib quad.mtl
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl wall
f 1/1/1 2/2/1 3/3/1 4/4/1
";

const QUAD_MTL: &str = "\
newmtl wall
map_Kd textures\\wall.png
map_Bump textures\\wall_n.png
map_Ka textures\\wall_r.png
map_Ks textures\\wall_m.png
map_d textures\\wall_a.png
";

// ============================================================================
// Tests: Import
// ============================================================================

#[test]
fn test_import_triangulates_quad() {
    let dir = write_model("quad", &[("quad.obj", QUAD_OBJ), ("quad.mtl", QUAD_MTL)]);
    let model = ObjImporter::new().import(&dir.join("quad.obj")).unwrap();

    assert_eq!(model.meshes.len(), 1);
    let mesh = &model.meshes[0];
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.triangle_count(), 2);
    assert_eq!(mesh.normals.len(), 4);
    assert_eq!(mesh.uvs.len(), 4);
    assert!(mesh.tangents.is_empty());
    assert_eq!(mesh.material_index, Some(0));
    assert_eq!(model.base_dir, dir);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_import_maps_material_channels() {
    let dir = write_model("channels", &[("quad.obj", QUAD_OBJ), ("quad.mtl", QUAD_MTL)]);
    let model = ObjImporter::new().import(&dir.join("quad.obj")).unwrap();

    assert_eq!(model.materials.len(), 1);
    let material = &model.materials[0];
    assert_eq!(material.name, "wall");
    assert_eq!(material.diffuse.as_deref(), Some("textures\\wall.png"));
    assert_eq!(material.bump.as_deref(), Some("textures\\wall_n.png"));
    assert_eq!(material.roughness.as_deref(), Some("textures\\wall_r.png"));
    assert_eq!(material.metallic.as_deref(), Some("textures\\wall_m.png"));
    assert_eq!(material.opacity.as_deref(), Some("textures\\wall_a.png"));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_import_without_mtl_yields_no_materials() {
    let obj = "o tri\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
    let dir = write_model("nomtl", &[("tri.obj", obj)]);
    let model = ObjImporter::new().import(&dir.join("tri.obj")).unwrap();

    assert!(model.materials.is_empty());
    assert_eq!(model.meshes.len(), 1);
    assert!(model.meshes[0].uvs.is_empty());
    assert_eq!(model.meshes[0].material_index, None);

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_import_missing_file_is_asset_error() {
    let result = ObjImporter::new().import(Path::new("/nonexistent/umbra/missing.obj"));
    assert!(matches!(result, Err(Error::AssetLoad(_))));
}
