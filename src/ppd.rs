//! PPD printer description generation.
//!
//! CUPS downloads this document when the printer is added and uses the
//! `cupsFilter` lines to decide which format print jobs are sent in.

use serde::{Deserialize, Serialize};

/// Document format the printer asks clients to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    #[default]
    Postscript,
    Pdf,
}

impl DocumentFormat {
    /// File extension for saved jobs.
    pub fn extension(self) -> &'static str {
        match self {
            DocumentFormat::Postscript => "ps",
            DocumentFormat::Pdf => "pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            DocumentFormat::Postscript => "application/postscript",
            DocumentFormat::Pdf => "application/pdf",
        }
    }
}

/// Printer description served on `*.ppd` paths.
#[derive(Debug, Clone)]
pub struct Ppd {
    pub model_name: String,
    pub manufacturer: String,
    pub format: DocumentFormat,
}

impl Ppd {
    pub fn new(model_name: impl Into<String>, format: DocumentFormat) -> Self {
        Self {
            model_name: model_name.into(),
            manufacturer: "ipp-server".to_string(),
            format,
        }
    }

    pub fn text(&self) -> String {
        let filter = match self.format {
            DocumentFormat::Postscript => {
                "*cupsFilter: \"application/vnd.cups-postscript 0 -\"".to_string()
            }
            DocumentFormat::Pdf => {
                "*cupsFilter2: \"application/pdf application/pdf 0 -\"".to_string()
            }
        };
        let short_name = format!("{}.ppd", self.model_name.replace(' ', "-").to_ascii_lowercase());

        [
            "*PPD-Adobe: \"4.3\"".to_string(),
            "*FormatVersion: \"4.3\"".to_string(),
            "*FileVersion: \"1.0\"".to_string(),
            "*LanguageVersion: English".to_string(),
            "*LanguageEncoding: ISOLatin1".to_string(),
            format!("*PCFileName: \"{short_name}\""),
            format!("*Manufacturer: \"{}\"", self.manufacturer),
            format!("*Product: \"({})\"", self.model_name),
            format!("*ModelName: \"{}\"", self.model_name),
            format!("*ShortNickName: \"{}\"", self.model_name),
            format!("*NickName: \"{}\"", self.model_name),
            "*PSVersion: \"(3010.000) 0\"".to_string(),
            "*LanguageLevel: \"3\"".to_string(),
            "*ColorDevice: True".to_string(),
            "*DefaultColorSpace: RGB".to_string(),
            "*FileSystem: False".to_string(),
            "*Throughput: \"1\"".to_string(),
            "*LandscapeOrientation: Plus90".to_string(),
            "*TTRasterizer: Type42".to_string(),
            filter,
            "*OpenUI *PageSize/Media Size: PickOne".to_string(),
            "*OrderDependency: 10 AnySetup *PageSize".to_string(),
            "*DefaultPageSize: A4".to_string(),
            "*PageSize A4/A4: \"<</PageSize[595 842]/ImagingBBox null>>setpagedevice\"".to_string(),
            "*PageSize Letter/US Letter: \"<</PageSize[612 792]/ImagingBBox null>>setpagedevice\"".to_string(),
            "*CloseUI: *PageSize".to_string(),
            "*DefaultImageableArea: A4".to_string(),
            "*ImageableArea A4/A4: \"0 0 595 842\"".to_string(),
            "*ImageableArea Letter/US Letter: \"0 0 612 792\"".to_string(),
            "*DefaultPaperDimension: A4".to_string(),
            "*PaperDimension A4/A4: \"595 842\"".to_string(),
            "*PaperDimension Letter/US Letter: \"612 792\"".to_string(),
            String::new(),
        ]
        .join("\n")
    }
}
