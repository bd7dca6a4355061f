use std::{
    env::{self, VarError},
    fmt,
    str::FromStr,
};

use anyhow::{anyhow, bail};
use image::ImageBuffer;
use jpeg_decoder::PixelFormat;
use once_cell::sync::Lazy;

use crate::Image;

const ENV_VAR: &str = "HANDMARK_JPEG_BACKEND";

/// The JPEG decoding backends we can choose between.
///
/// Selected process-wide via the `HANDMARK_JPEG_BACKEND` environment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[non_exhaustive]
pub enum JpegBackend {
    /// Uses the `zune-jpeg` crate, a pure-Rust JPEG decoder somewhat faster than `jpeg-decoder`.
    #[default]
    ZuneJpeg,
    /// Uses the `jpeg-decoder` crate, a robust but slow pure-Rust JPEG decoder.
    JpegDecoder,
}

impl JpegBackend {
    /// Returns the backend selected by the environment, or the default if the variable is unset.
    pub fn from_env() -> anyhow::Result<Self> {
        match env::var(ENV_VAR) {
            Ok(v) => v.parse(),
            Err(VarError::NotPresent) => Ok(Self::default()),
            Err(VarError::NotUnicode(s)) => bail!(
                "invalid value set for `{ENV_VAR}` variable: {}",
                s.to_string_lossy()
            ),
        }
    }

    /// Decodes `data` with this backend.
    pub fn decode(self, data: &[u8]) -> anyhow::Result<Image> {
        let buf = match self {
            JpegBackend::ZuneJpeg => {
                use zune_jpeg::zune_core::colorspace::ColorSpace;
                use zune_jpeg::zune_core::options::DecoderOptions;

                let mut decomp = zune_jpeg::JpegDecoder::new_with_options(
                    DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGBA),
                    data,
                );
                decomp.decode_headers()?;
                let colorspace = decomp
                    .get_output_colorspace()
                    .ok_or_else(|| anyhow!("missing output colorspace after decoding headers"))?;
                if colorspace != ColorSpace::RGBA {
                    bail!("unsupported colorspace {colorspace:?} (expected RGBA)");
                }

                let size = decomp
                    .output_buffer_size()
                    .ok_or_else(|| anyhow!("failed to compute output buffer size"))?;
                let mut buf = vec![0; size];
                decomp.decode_into(&mut buf)?;
                let (width, height) = decomp
                    .dimensions()
                    .ok_or_else(|| anyhow!("missing image dimensions"))?;
                ImageBuffer::from_raw(width.into(), height.into(), buf)
                    .ok_or_else(|| anyhow!("decoded buffer does not match image dimensions"))?
            }
            JpegBackend::JpegDecoder => {
                let mut decoder = jpeg_decoder::Decoder::new(data);
                let pixels = decoder.decode()?;
                let info = decoder
                    .info()
                    .ok_or_else(|| anyhow!("missing image info after decoding"))?;
                let rgba: Vec<u8> = match info.pixel_format {
                    PixelFormat::RGB24 => pixels
                        .chunks_exact(3)
                        .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
                        .collect(),
                    PixelFormat::L8 => pixels.iter().flat_map(|&l| [l, l, l, 255]).collect(),
                    format => bail!("unsupported JPEG pixel format {format:?}"),
                };
                ImageBuffer::from_raw(info.width.into(), info.height.into(), rgba)
                    .ok_or_else(|| anyhow!("decoded buffer does not match image dimensions"))?
            }
        };

        Ok(Image { buf })
    }
}

impl FromStr for JpegBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zune-jpeg" => Ok(Self::ZuneJpeg),
            "jpeg-decoder" => Ok(Self::JpegDecoder),
            _ => bail!("invalid value set for `{ENV_VAR}` variable: '{s}'"),
        }
    }
}

impl fmt::Display for JpegBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JpegBackend::ZuneJpeg => "zune-jpeg",
            JpegBackend::JpegDecoder => "jpeg-decoder",
        })
    }
}

// An invalid selection is reported on every decode instead of terminating the process.
static JPEG_BACKEND: Lazy<Result<JpegBackend, String>> = Lazy::new(|| {
    let backend = JpegBackend::from_env().map_err(|e| e.to_string());
    match &backend {
        Ok(backend) => log::debug!("using JPEG decode backend: {backend}"),
        Err(e) => log::error!("{e}"),
    }
    backend
});

pub(crate) fn decode_jpeg(data: &[u8]) -> anyhow::Result<Image> {
    let backend = *JPEG_BACKEND.as_ref().map_err(|e| anyhow!("{e}"))?;
    backend.decode(data)
}
