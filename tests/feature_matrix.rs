//! Feature matrix tests - verify the simplifier set matches the enabled features

use avatar_asset::lod::default_simplifier;
use avatar_asset::{DefaultSimplifier, MeshSimplifier, ModelData};

#[test]
fn test_default_simplifier_available() {
    let simplifier = DefaultSimplifier::new();
    let mesh = ModelData::grid(40, 40);

    let simplified = simplifier.simplify(&mesh, 0.5, 0.1);
    assert!(simplified.triangle_count() < mesh.triangle_count());
    assert_eq!(simplifier.name(), "vertex-clustering");
}

#[cfg(not(feature = "lod"))]
#[test]
fn test_fallback_simplifier_without_lod() {
    assert_eq!(default_simplifier().name(), "vertex-clustering");
}

#[cfg(feature = "lod")]
#[test]
fn test_meshopt_simplifier_with_lod() {
    use avatar_asset::MeshoptSimplifier;

    assert_eq!(default_simplifier().name(), "meshopt");

    let mesh = ModelData::grid(40, 40);
    let simplified = MeshoptSimplifier::new().simplify(&mesh, 0.5, 0.1);
    assert!(simplified.triangle_count() < mesh.triangle_count());
}
