
#[cfg(debug_assertions)]
pub fn get_backend_url() -> &'static str {
    "http://localhost:3001"  // Development URL when running locally
}

#[cfg(not(debug_assertions))]
pub fn get_backend_url() -> &'static str {
    ""  // Production URL, served behind the same origin
}

pub fn background_image_url() -> &'static str {
    option_env!("WAITLIST_BACKGROUND_URL").unwrap_or("/assets/waitlist-background.webp")
}

pub fn logo_url() -> &'static str {
    option_env!("WAITLIST_LOGO_URL").unwrap_or("/assets/logo.png")
}
