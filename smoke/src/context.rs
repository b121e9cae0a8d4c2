use crate::smoke::Problem;
use glow::HasContext;
use serde::Serialize;

// Exposed by OES_texture_half_float. WebGL1 has no core half-float type.
pub const HALF_FLOAT_OES: u32 = 0x8D61;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Tier {
    WebGl1,
    WebGl2,
    Desktop,
}

impl Tier {
    /// WebGL1 lacks vertex array objects without an extension. The desktop
    /// core profile refuses to draw without one bound.
    pub fn uses_vertex_array(&self) -> bool {
        !matches!(self, Tier::WebGl1)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TextureFormat {
    pub internal_format: u32,
    pub format: u32,
    pub type_: u32,
}

impl TextureFormat {
    pub const RGBA16F: Self = Self {
        internal_format: glow::RGBA16F,
        format: glow::RGBA,
        type_: glow::HALF_FLOAT,
    };

    pub const RG16F: Self = Self {
        internal_format: glow::RG16F,
        format: glow::RG,
        type_: glow::HALF_FLOAT,
    };

    pub const RGBA_HALF_FLOAT_OES: Self = Self {
        internal_format: glow::RGBA,
        format: glow::RGBA,
        type_: HALF_FLOAT_OES,
    };

    /// Number of channels a texel of this format stores.
    pub fn channels(&self) -> usize {
        match self.format {
            glow::RED => 1,
            glow::RG => 2,
            glow::RGB => 3,
            _ => 4,
        }
    }
}

/// What the acquired context can do, and the formats the fields are stored in.
#[derive(Clone, Debug, PartialEq)]
pub struct Capabilities {
    pub tier: Tier,
    pub color_format: TextureFormat,
    pub vector_format: TextureFormat,
    pub linear_filtering: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ContextVersion {
    pub major: u32,
    pub minor: u32,
    pub is_embedded: bool,
}

impl Capabilities {
    pub fn webgl2(linear_filtering: bool) -> Self {
        Self {
            tier: Tier::WebGl2,
            color_format: TextureFormat::RGBA16F,
            vector_format: TextureFormat::RG16F,
            linear_filtering,
        }
    }

    pub fn webgl1(linear_filtering: bool) -> Self {
        Self {
            tier: Tier::WebGl1,
            color_format: TextureFormat::RGBA_HALF_FLOAT_OES,
            vector_format: TextureFormat::RGBA_HALF_FLOAT_OES,
            linear_filtering,
        }
    }

    pub fn desktop() -> Self {
        Self {
            tier: Tier::Desktop,
            color_format: TextureFormat::RGBA16F,
            vector_format: TextureFormat::RG16F,
            linear_filtering: true,
        }
    }

    pub fn detect(context: &glow::Context) -> Result<Self, Problem> {
        let version = context.version();
        let extensions = context.supported_extensions();

        log::debug!(
            "Context version {}.{} ({})",
            version.major,
            version.minor,
            if version.is_embedded { "ES" } else { "core" }
        );

        Self::select(
            ContextVersion {
                major: version.major,
                minor: version.minor,
                is_embedded: version.is_embedded,
            },
            |name| {
                // Native drivers report the `GL_` prefix. Browsers don't.
                extensions.contains(name) || extensions.contains(&format!("GL_{}", name))
            },
        )
    }

    pub fn select<F>(version: ContextVersion, has_extension: F) -> Result<Self, Problem>
    where
        F: Fn(&str) -> bool,
    {
        let ContextVersion {
            major,
            minor,
            is_embedded,
        } = version;

        if !is_embedded {
            return if (major, minor) >= (3, 3) {
                Ok(Self::desktop())
            } else {
                Err(Problem::ContextUnavailable(format!(
                    "OpenGL {}.{} is too old, 3.3 is required",
                    major, minor
                )))
            };
        }

        match major {
            major if major >= 3 => {
                if !has_extension("EXT_color_buffer_float") {
                    return Err(Problem::ContextUnavailable(
                        "Rendering to half-float textures requires EXT_color_buffer_float".into(),
                    ));
                }

                Ok(Self::webgl2(has_extension("OES_texture_float_linear")))
            }

            2 => {
                if !has_extension("OES_texture_half_float") {
                    return Err(Problem::ContextUnavailable(
                        "Half-float textures require OES_texture_half_float".into(),
                    ));
                }

                Ok(Self::webgl1(has_extension("OES_texture_half_float_linear")))
            }

            _ => Err(Problem::ContextUnavailable(format!(
                "OpenGL ES {}.{} is not supported",
                major, minor
            ))),
        }
    }
}

/// Attributes requested for the drawing surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAttributes {
    pub alpha: bool,
    pub depth: bool,
    pub stencil: bool,
    pub antialias: bool,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            alpha: false,
            depth: false,
            stencil: false,
            antialias: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn es(major: u32, minor: u32) -> ContextVersion {
        ContextVersion {
            major,
            minor,
            is_embedded: true,
        }
    }

    #[test]
    fn webgl2_with_linear_filtering() {
        let capabilities = Capabilities::select(es(3, 0), |name| {
            ["EXT_color_buffer_float", "OES_texture_float_linear"].contains(&name)
        })
        .unwrap();

        assert_eq!(capabilities.tier, Tier::WebGl2);
        assert_eq!(capabilities.color_format, TextureFormat::RGBA16F);
        assert_eq!(capabilities.vector_format, TextureFormat::RG16F);
        assert!(capabilities.linear_filtering);
    }

    #[test]
    fn webgl2_without_linear_filtering() {
        let capabilities =
            Capabilities::select(es(3, 0), |name| name == "EXT_color_buffer_float").unwrap();

        assert_eq!(capabilities.tier, Tier::WebGl2);
        assert!(!capabilities.linear_filtering);
    }

    #[test]
    fn webgl2_requires_float_render_targets() {
        let result = Capabilities::select(es(3, 0), |name| name == "OES_texture_float_linear");
        assert!(matches!(result, Err(Problem::ContextUnavailable(_))));
    }

    #[test]
    fn webgl1_falls_back_to_half_float_oes() {
        let capabilities =
            Capabilities::select(es(2, 0), |name| name == "OES_texture_half_float").unwrap();

        assert_eq!(capabilities.tier, Tier::WebGl1);
        assert_eq!(capabilities.color_format.type_, HALF_FLOAT_OES);
        assert_eq!(capabilities.vector_format.format, glow::RGBA);
        assert!(!capabilities.linear_filtering);
        assert!(!capabilities.tier.uses_vertex_array());
    }

    #[test]
    fn webgl1_requires_half_floats() {
        let result = Capabilities::select(es(2, 0), |_| false);
        assert!(matches!(result, Err(Problem::ContextUnavailable(_))));
    }

    #[test]
    fn desktop_needs_gl_3_3() {
        let core = |major, minor| ContextVersion {
            major,
            minor,
            is_embedded: false,
        };

        let capabilities = Capabilities::select(core(4, 1), |_| false).unwrap();
        assert_eq!(capabilities, Capabilities::desktop());
        assert!(capabilities.tier.uses_vertex_array());

        assert!(Capabilities::select(core(3, 2), |_| true).is_err());
    }

    #[test]
    fn format_channels() {
        assert_eq!(TextureFormat::RG16F.channels(), 2);
        assert_eq!(TextureFormat::RGBA16F.channels(), 4);
        assert_eq!(TextureFormat::RGBA_HALF_FLOAT_OES.channels(), 4);
    }

    #[test]
    fn surface_attributes_are_minimal() {
        let attributes = ContextAttributes::default();
        assert!(!attributes.alpha && !attributes.depth);
        assert!(!attributes.stencil && !attributes.antialias);
    }
}
