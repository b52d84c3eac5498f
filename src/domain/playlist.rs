use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

pub struct VariantStream {
    pub bandwidth: u64,
    pub resolution: Option<String>,
    pub uri: String,
}

/// HLS master playlist pointing at one media playlist per rendition.
pub struct MasterPlaylist {
    pub version: u8,
    pub independent_segments: bool,
    pub variants: Vec<VariantStream>,
}

impl MasterPlaylist {
    pub fn new() -> Self {
        Self {
            version: 3,
            independent_segments: false,
            variants: Vec::new(),
        }
    }

    pub fn add_variant(&mut self, bandwidth: u64, resolution: Option<String>, uri: String) {
        self.variants.push(VariantStream {
            bandwidth,
            resolution,
            uri,
        });
    }

    pub async fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut file = File::create(path).await?;

        file.write_all(b"#EXTM3U\n").await?;
        file.write_all(format!("#EXT-X-VERSION:{}\n", self.version).as_bytes())
            .await?;

        if self.independent_segments {
            file.write_all(b"#EXT-X-INDEPENDENT-SEGMENTS\n").await?;
        }

        for variant in &self.variants {
            let mut attrs = format!("BANDWIDTH={}", variant.bandwidth);
            if let Some(res) = &variant.resolution {
                attrs.push_str(&format!(",RESOLUTION={}", res));
            }
            file.write_all(format!("#EXT-X-STREAM-INF:{}\n", attrs).as_bytes())
                .await?;
            file.write_all(variant.uri.as_bytes()).await?;
            file.write_all(b"\n").await?;
        }

        Ok(())
    }
}

impl Default for MasterPlaylist {
    fn default() -> Self {
        Self::new()
    }
}
