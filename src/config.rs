//! Configuration types for exam document generation.
//!
//! Everything that shapes the generated document is held in
//! [`GeneratorConfig`], built via its [`GeneratorConfigBuilder`]. The HTTP
//! surface has its own small [`ServerConfig`]. Both are constructed once at
//! process start and shared read-only across requests.

use crate::error::SimuladoError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// EMUs (English Metric Units) per inch, the unit DOCX uses for drawings.
pub const EMU_PER_INCH: f64 = 914_400.0;

/// Configuration for turning an exam request into a document.
///
/// # Example
/// ```rust
/// use simulado_docx::GeneratorConfig;
///
/// let config = GeneratorConfig::builder()
///     .dpi(200)
///     .chart_width_in(4.5)
///     .build()
///     .unwrap();
/// assert_eq!(config.dpi, 200);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Raster resolution for synthesized charts. Range: 72–400. Default: 150.
    ///
    /// Charts are drawn in CSS pixels (96 per inch) and scaled by `dpi / 96`
    /// when rasterised, so the printed size stays the same while sharpness
    /// follows this value.
    pub dpi: u32,

    /// Width of a supplied (base64) picture in the document, in inches. Default: 3.5.
    pub picture_width_in: f64,

    /// Width of a synthesized chart in the document, in inches. Default: 5.0.
    pub chart_width_in: f64,

    /// Maximum number of ticks a number line may have. Default: 200.
    ///
    /// A `step` of 0.0001 over a range of 1 000 would otherwise ask for ten
    /// million tick marks.
    pub max_ticks: usize,

    /// Maximum number of bars a bar chart may have. Default: 60.
    ///
    /// Each bar widens the drawing, so an unbounded category list would ask
    /// the rasteriser for an arbitrarily large surface.
    pub max_bars: usize,

    /// Title used when the request names neither a title nor a subject. Default: "Exam".
    pub default_title: String,

    /// Subject used in the download filename when none is given. Default: "General".
    pub default_subject: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            picture_width_in: 3.5,
            chart_width_in: 5.0,
            max_ticks: 200,
            max_bars: 60,
            default_title: "Exam".to_string(),
            default_subject: "General".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Create a new builder for `GeneratorConfig`.
    pub fn builder() -> GeneratorConfigBuilder {
        GeneratorConfigBuilder {
            config: Self::default(),
        }
    }

    /// Supplied picture width in EMU.
    pub fn picture_width_emu(&self) -> u32 {
        (self.picture_width_in * EMU_PER_INCH).round() as u32
    }

    /// Synthesized chart width in EMU.
    pub fn chart_width_emu(&self) -> u32 {
        (self.chart_width_in * EMU_PER_INCH).round() as u32
    }
}

/// Builder for [`GeneratorConfig`].
#[derive(Debug)]
pub struct GeneratorConfigBuilder {
    config: GeneratorConfig,
}

impl GeneratorConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn picture_width_in(mut self, inches: f64) -> Self {
        self.config.picture_width_in = inches;
        self
    }

    pub fn chart_width_in(mut self, inches: f64) -> Self {
        self.config.chart_width_in = inches;
        self
    }

    pub fn max_ticks(mut self, n: usize) -> Self {
        self.config.max_ticks = n;
        self
    }

    pub fn max_bars(mut self, n: usize) -> Self {
        self.config.max_bars = n;
        self
    }

    pub fn default_title(mut self, title: impl Into<String>) -> Self {
        self.config.default_title = title.into();
        self
    }

    pub fn default_subject(mut self, subject: impl Into<String>) -> Self {
        self.config.default_subject = subject.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<GeneratorConfig, SimuladoError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(SimuladoError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        for (name, width) in [
            ("picture width", c.picture_width_in),
            ("chart width", c.chart_width_in),
        ] {
            if !width.is_finite() || width <= 0.0 || width > 8.5 {
                return Err(SimuladoError::InvalidConfig(format!(
                    "{name} must be within (0, 8.5] inches, got {width}"
                )));
            }
        }
        if c.max_ticks < 3 {
            return Err(SimuladoError::InvalidConfig(format!(
                "max_ticks must be ≥ 3, got {}",
                c.max_ticks
            )));
        }
        if c.max_bars == 0 || c.max_bars > 1_000 {
            return Err(SimuladoError::InvalidConfig(format!(
                "max_bars must be 1–1000, got {}",
                c.max_bars
            )));
        }
        if c.default_subject.trim().is_empty() {
            return Err(SimuladoError::InvalidConfig(
                "default subject must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Bind address and request limits for the HTTP service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind. Default: 0.0.0.0.
    pub host: IpAddr,
    /// TCP port. Default: 5000.
    pub port: u16,
    /// Largest accepted request body in bytes. Default: 25 MiB.
    ///
    /// Pictures travel inline as base64, so exams with several images can
    /// easily exceed axum's 2 MiB default.
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
            body_limit_bytes: 25 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
