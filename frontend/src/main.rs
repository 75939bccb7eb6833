use yew::prelude::*;
use log::{info, Level};

mod api;
mod config;
mod countdown;
mod signup;
mod pages {
    pub mod waitlist;
}

use pages::waitlist::Waitlist;

#[function_component]
fn App() -> Html {
    html! {
        <Waitlist />
    }
}

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(Level::Info).expect("error initializing log");

    info!("Starting waitlist page, backend at {:?}", config::get_backend_url());
    yew::Renderer::<App>::new().render();
}
