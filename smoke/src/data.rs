// Common geometries

// A full-screen quad in clip space, drawn as two triangles.
#[rustfmt::skip]
pub static PLANE_VERTICES: [f32; 8] = [
    -1.0, -1.0,
    -1.0,  1.0,
     1.0,  1.0,
     1.0, -1.0,
];

pub static PLANE_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];
