use nalgebra::Vector3;
use ndarray::Array3;
use tracing::info;
use tracing_subscriber::EnvFilter;

use volume_roi::{Orientation, Roi, RoiType, Volume, Voxel};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Sphere of radius 20 voxels with a dimmer shell around it
    let data = Array3::from_shape_fn((64, 64, 64), |(z, y, x)| {
        let r = ((x as f32 - 32.0).powi(2) + (y as f32 - 32.0).powi(2) + (z as f32 - 32.0).powi(2)).sqrt();
        if r < 20.0 {
            100.0
        } else if r < 24.0 {
            50.0
        } else {
            0.0
        }
    });
    let volume = Volume::new(data, Vector3::new(0.8, 0.8, 1.5)).expect("should have built volume");

    let mut roi = Roi::new("sphere", RoiType::Isocontour3D);
    roi.set_isocontour(&volume, Voxel::new(32, 32, 32))
        .expect("seed should be inside the volume");
    roi.erase_area(Voxel::new(20, 20, 20), 4)
        .expect("erase center should be inside the mask");

    let mask = roi.isocontour().expect("should have an isocontour");
    info!(
        included = mask.included_count(),
        interior = mask.interior_count(),
        boundary = mask.boundary_count(),
        "Segmented sphere"
    );

    let slice = volume
        .slice_from_axis(volume.dim().z / 2, Orientation::Axial)
        .expect("should have a center slice");
    let outline = roi
        .get_outline(&slice)
        .expect("center slice should cross the sphere");
    let image = outline.to_image().expect("should have converted mask to image");
    image.save("result.png").expect("should have saved image");
}
