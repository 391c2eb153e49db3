//! Test fixtures: small media payloads and multipart forms.

use axum_test::multipart::{MultipartForm, Part};

/// Minimal valid 1x1 PNG bytes.
pub fn minimal_png() -> Vec<u8> {
    vec![
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
        0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x08, 0xD7, 0x63, 0xF8,
        0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x18, 0xDD, 0x8D, 0x89, 0x00, 0x00, 0x00,
        0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ]
}

/// Bytes that start like an MP4 `ftyp` box; the service never decodes them.
pub fn fake_mp4(len: usize) -> Vec<u8> {
    let mut data = vec![
        0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm',
    ];
    data.resize(len.max(data.len()), 0xAB);
    data
}

pub fn video_part(data: Vec<u8>) -> Part {
    Part::bytes(data).file_name("movie.mp4").mime_type("video/mp4")
}

pub fn thumbnail_part(data: Vec<u8>) -> Part {
    Part::bytes(data).file_name("poster.png").mime_type("image/png")
}

/// Complete upload form with both files and every metadata field.
pub fn movie_form(title: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("title", title)
        .add_text("description", "A heist thriller")
        .add_text("category", "Action")
        .add_text("language", "English")
        .add_text("quality", "HD")
        .add_part("thumbnail", thumbnail_part(minimal_png()))
        .add_part("video", video_part(fake_mp4(4096)))
}
