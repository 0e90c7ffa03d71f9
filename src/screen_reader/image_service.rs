//! OpenCV template matching and Tesseract OCR behind the `Locator` trait

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage};
use opencv::{
    core::{min_max_loc, no_array, Mat, MatTraitConst, Point, CV_8UC1},
    imgcodecs, imgproc,
    prelude::*,
};
use parking_lot::Mutex;
use rusty_tesseract::{Args, Image as TessImage, TessError};

use super::locator::{Locator, Template, TextHit};
use super::screen_service::{Region, ScreenService};
use crate::error::LocatorError;
use crate::geometry::MatchBox;

/// Upper bound on hits reported by `locate_all`
const MATCH_LIMIT: usize = 10_000;

/// Image service for template matching and OCR on the live screen
pub struct ImageService {
    screen_service: ScreenService,
    images_folder: PathBuf,
    templates: Mutex<HashMap<Template, Mat>>,
}

impl ImageService {
    pub fn new(images_folder: impl Into<PathBuf>) -> Self {
        Self {
            screen_service: ScreenService::new(),
            images_folder: images_folder.into(),
            templates: Mutex::new(HashMap::new()),
        }
    }

    /// Get path to a template image
    pub fn get_image_path(&self, template: Template) -> PathBuf {
        self.images_folder.join(template.file_name())
    }

    /// Convert image::GrayImage to an owned OpenCV Mat
    fn gray_image_to_mat(img: &GrayImage) -> opencv::Result<Mat> {
        let (width, height) = (img.width() as i32, img.height() as i32);
        let step = img.width() as usize;
        // SAFETY: the buffer outlives the borrowed Mat, which is cloned before return
        let mat = unsafe {
            Mat::new_rows_cols_with_data_unsafe(
                height,
                width,
                CV_8UC1,
                img.as_raw().as_ptr() as *mut std::ffi::c_void,
                step,
            )?
        };
        Ok(mat.clone())
    }

    fn load_template_grayscale(path: &Path) -> opencv::Result<Mat> {
        let path_str = path.to_str().ok_or_else(|| {
            opencv::Error::new(opencv::core::StsError, "Invalid path: non-UTF8 characters")
        })?;
        imgcodecs::imread(path_str, imgcodecs::IMREAD_GRAYSCALE)
    }

    /// Grayscale template, loaded once
    fn template(&self, template: Template) -> Option<Mat> {
        let mut cache = self.templates.lock();
        if let Some(mat) = cache.get(&template) {
            return Some(mat.clone());
        }
        let path = self.get_image_path(template);
        match Self::load_template_grayscale(&path) {
            Ok(mat) if !mat.empty() => {
                cache.insert(template, mat.clone());
                Some(mat)
            }
            _ => {
                tracing::warn!("[IMAGE] Template not found or empty: {:?}", path);
                None
            }
        }
    }

    /// TM_CCOEFF_NORMED scores above `confidence`, relative to `haystack`
    fn match_all(&self, template: Template, haystack: &RgbImage, confidence: f32) -> Vec<MatchBox> {
        let Some(needle) = self.template(template) else {
            return Vec::new();
        };
        let gray = DynamicImage::ImageRgb8(haystack.clone()).to_luma8();
        let Ok(img_mat) = Self::gray_image_to_mat(&gray) else {
            return Vec::new();
        };

        if needle.cols() > img_mat.cols() || needle.rows() > img_mat.rows() {
            tracing::trace!("[IMAGE] Template {:?} larger than search area, skipping", template);
            return Vec::new();
        }

        let mut result = Mat::default();
        if imgproc::match_template(&img_mat, &needle, &mut result, imgproc::TM_CCOEFF_NORMED, &no_array())
            .is_err()
        {
            return Vec::new();
        }

        let mut max_val = 0.0;
        let mut max_loc = Point::new(0, 0);
        if min_max_loc(&result, None, Some(&mut max_val), None, Some(&mut max_loc), &no_array()).is_err() {
            return Vec::new();
        }
        if max_val <= confidence as f64 {
            tracing::trace!(
                "[IMAGE] '{}' NOT FOUND - score={:.3} <= threshold={:.2}",
                template.file_name(),
                max_val,
                confidence
            );
            return Vec::new();
        }

        let mut hits = Vec::new();
        'rows: for y in 0..result.rows() {
            for x in 0..result.cols() {
                let Ok(score) = result.at_2d::<f32>(y, x) else {
                    continue;
                };
                if *score > confidence {
                    if let Ok(b) = MatchBox::from_match(x, y, needle.cols(), needle.rows()) {
                        hits.push(b);
                    }
                    if hits.len() >= MATCH_LIMIT {
                        break 'rows;
                    }
                }
            }
        }
        tracing::debug!(
            "[IMAGE] FOUND '{}' x{} best at ({}, {}) score={:.3}",
            template.file_name(),
            hits.len(),
            max_loc.x,
            max_loc.y,
            max_val
        );
        hits
    }
}

impl Locator for ImageService {
    fn capture(&self, region: Option<Region>) -> Option<RgbImage> {
        self.screen_service.safe_screenshot(region)
    }

    fn locate_all(&self, template: Template, region: Option<Region>, confidence: f32) -> Vec<MatchBox> {
        let Some(haystack) = self.capture(region) else {
            return Vec::new();
        };
        let (dx, dy) = region.map(|r| (r.left, r.top)).unwrap_or((0, 0));
        self.match_all(template, &haystack, confidence)
            .into_iter()
            .map(|b| b.translated(dx, dy))
            .collect()
    }

    fn locate_in(&self, template: Template, haystack: &RgbImage, confidence: f32) -> Option<MatchBox> {
        self.match_all(template, haystack, confidence).into_iter().next()
    }

    fn read_text(&self, image: &RgbImage, whitelist: &str) -> Result<Vec<TextHit>, LocatorError> {
        let dynamic = DynamicImage::ImageRgb8(image.clone());
        let tess_image = TessImage::from_dynamic_image(&dynamic).map_err(tess_error)?;

        let mut config_variables = HashMap::new();
        if !whitelist.is_empty() {
            config_variables.insert("tessedit_char_whitelist".to_string(), whitelist.to_string());
        }
        let args = Args {
            lang: "eng".to_string(),
            config_variables,
            dpi: Some(150),
            psm: Some(11), // sparse text: names float over the scene
            oem: Some(3),
        };

        let output = rusty_tesseract::image_to_data(&tess_image, &args).map_err(tess_error)?;
        Ok(output
            .data
            .into_iter()
            .filter(|d| !d.text.trim().is_empty())
            .map(|d| TextHit {
                text: d.text,
                left: d.left,
                top: d.top,
                width: d.width,
                height: d.height,
                conf: d.conf,
            })
            .collect())
    }
}

fn tess_error(e: TessError) -> LocatorError {
    match e {
        TessError::TesseractNotFoundError => LocatorError::OcrUnavailable,
        other => LocatorError::Ocr(format!("{:?}", other)),
    }
}
