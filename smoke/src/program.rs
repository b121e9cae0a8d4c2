use crate::context::{Capabilities, Tier};
use crate::render::{Context, Problem, Program};

const BASE_VERTEX_SHADER: &str = include_str!("../shaders/base.vert");
const CLEAR_SHADER: &str = include_str!("../shaders/clear.frag");
const DISPLAY_SHADER: &str = include_str!("../shaders/display.frag");
const SPLAT_SHADER: &str = include_str!("../shaders/splat.frag");
const ADVECTION_SHADER: &str = include_str!("../shaders/advection.frag");
const ADVECTION_MANUAL_SHADER: &str = include_str!("../shaders/advection_manual.frag");
const DIVERGENCE_SHADER: &str = include_str!("../shaders/divergence.frag");
const CURL_SHADER: &str = include_str!("../shaders/curl.frag");
const VORTICITY_SHADER: &str = include_str!("../shaders/vorticity.frag");
const PRESSURE_SHADER: &str = include_str!("../shaders/pressure.frag");
const GRADIENT_SUBTRACT_SHADER: &str = include_str!("../shaders/gradient_subtract.frag");

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Stage {
    Vertex,
    Fragment,
}

/// The shaders are written in GLSL 1.00. Newer dialects get a header that
/// maps the old built-ins onto their replacements.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ShaderDialect {
    Glsl100,
    Glsl300Es,
    Glsl330,
}

impl ShaderDialect {
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::WebGl1 => ShaderDialect::Glsl100,
            Tier::WebGl2 => ShaderDialect::Glsl300Es,
            Tier::Desktop => ShaderDialect::Glsl330,
        }
    }

    pub fn header(&self, stage: Stage) -> String {
        let mut header = String::new();

        match self {
            ShaderDialect::Glsl100 => (),
            ShaderDialect::Glsl300Es => header.push_str("#version 300 es\n"),
            ShaderDialect::Glsl330 => header.push_str("#version 330 core\n"),
        }

        // Desktop GLSL ignores precision qualifiers.
        if *self != ShaderDialect::Glsl330 {
            header.push_str("precision highp float;\n");
            header.push_str("precision mediump sampler2D;\n");
        }

        if *self != ShaderDialect::Glsl100 {
            header.push_str("#define texture2D texture\n");

            match stage {
                Stage::Vertex => {
                    header.push_str("#define attribute in\n");
                    header.push_str("#define varying out\n");
                }
                Stage::Fragment => {
                    header.push_str("#define varying in\n");
                    header.push_str("out vec4 smoke_FragColor;\n");
                    header.push_str("#define gl_FragColor smoke_FragColor\n");
                }
            }
        }

        header
    }

    pub fn preprocess(&self, stage: Stage, source: &str) -> String {
        self.header(stage) + source
    }
}

/// Which advection program to run. Picked once, when the programs are built.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AdvectionVariant {
    /// Relies on the hardware's bilinear filtering.
    Filtered,
    /// Reconstructs bilinear filtering from four nearest fetches.
    ManualBilinear,
}

impl AdvectionVariant {
    pub fn for_capabilities(capabilities: &Capabilities) -> Self {
        if capabilities.linear_filtering {
            AdvectionVariant::Filtered
        } else {
            AdvectionVariant::ManualBilinear
        }
    }

    fn fragment_source(&self) -> &'static str {
        match self {
            AdvectionVariant::Filtered => ADVECTION_SHADER,
            AdvectionVariant::ManualBilinear => ADVECTION_MANUAL_SHADER,
        }
    }
}

pub struct Programs {
    pub dialect: ShaderDialect,
    pub advection_variant: AdvectionVariant,
    pub clear: Program,
    pub display: Program,
    pub splat: Program,
    pub advection: Program,
    pub divergence: Program,
    pub curl: Program,
    pub vorticity: Program,
    pub pressure: Program,
    pub gradient_subtract: Program,
}

impl Programs {
    pub fn new(context: &Context, capabilities: &Capabilities) -> Result<Self, Problem> {
        let dialect = ShaderDialect::for_tier(capabilities.tier);
        let advection_variant = AdvectionVariant::for_capabilities(capabilities);
        let vertex = dialect.preprocess(Stage::Vertex, BASE_VERTEX_SHADER);

        let build = |name: &'static str, fragment: &str| {
            let fragment = dialect.preprocess(Stage::Fragment, fragment);
            Program::new(context, name, (vertex.as_str(), fragment.as_str()))
        };

        log::debug!(
            "Building programs for {:?} with {:?} advection",
            dialect,
            advection_variant
        );

        Ok(Self {
            dialect,
            advection_variant,
            clear: build("clear", CLEAR_SHADER)?,
            display: build("display", DISPLAY_SHADER)?,
            splat: build("splat", SPLAT_SHADER)?,
            advection: build("advection", advection_variant.fragment_source())?,
            divergence: build("divergence", DIVERGENCE_SHADER)?,
            curl: build("curl", CURL_SHADER)?,
            vorticity: build("vorticity", VORTICITY_SHADER)?,
            pressure: build("pressure", PRESSURE_SHADER)?,
            gradient_subtract: build("gradient_subtract", GRADIENT_SUBTRACT_SHADER)?,
        })
    }
}
