//! Cameras (`GLTFCamera`) and punctual lights (`GLTFLight`)

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        /// Vertical field of view in radians
        yfov: f32,
        aspect_ratio: Option<f32>,
        znear: f32,
        /// `None` means an infinite projection
        zfar: Option<f32>,
    },
    Orthographic {
        xmag: f32,
        ymag: f32,
        znear: f32,
        zfar: f32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: None,
            projection: Projection::Perspective {
                yfov: 75f32.to_radians(),
                aspect_ratio: None,
                znear: 0.05,
                zfar: Some(4000.0),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional,
    Point,
    Spot {
        inner_cone_angle: f32,
        outer_cone_angle: f32,
    },
}

impl LightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Directional => "directional",
            Self::Point => "point",
            Self::Spot { .. } => "spot",
        }
    }
}

/// `KHR_lights_punctual` light
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub name: Option<String>,
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
    /// `None` means unlimited range
    pub range: Option<f32>,
}

impl Light {
    pub const DEFAULT_OUTER_CONE_ANGLE: f32 = std::f32::consts::FRAC_PI_4;

    pub fn new(kind: LightKind) -> Self {
        Self {
            name: None,
            kind,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            range: None,
        }
    }
}
