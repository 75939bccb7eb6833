use yew::prelude::*;
use web_sys::HtmlInputElement;
use wasm_bindgen_futures::spawn_local;
use gloo_timers::callback::Interval;
use chrono::Utc;
use log::{error, info};
use crate::api;
use crate::config;
use crate::countdown::{Countdown, TimeLeft, TICK_INTERVAL_MS};
use crate::signup::Signup;

/// Which card the page shows in the panel slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Panel {
    Signup,
    Confirmation,
}

impl Panel {
    pub fn for_signup(signup: &Signup) -> Self {
        if signup.is_submitted() {
            Panel::Confirmation
        } else {
            Panel::Signup
        }
    }
}

/// After a submit the countdown moves above the panel; at zero its digits dim.
pub fn countdown_classes(time_left: &TimeLeft, submitted: bool) -> Classes {
    classes!(
        "countdown",
        submitted.then(|| "countdown-submitted"),
        time_left.is_zero().then(|| "countdown-finished")
    )
}

/// Dependency of the ticking effect. The interval only exists while this is
/// `false`, so the flip at the deadline tears it down.
pub fn timer_key(countdown: &Countdown) -> bool {
    countdown.is_finished()
}

#[derive(Properties, PartialEq)]
pub struct CountdownDisplayProps {
    pub time_left: TimeLeft,
    pub submitted: bool,
}

#[function_component(CountdownDisplay)]
pub fn countdown_display(props: &CountdownDisplayProps) -> Html {
    let class = countdown_classes(&props.time_left, props.submitted);
    let label = format!("{} seconds remaining", props.time_left.total_seconds());

    html! {
        <div class={class} role="timer" aria-label={label}>
            { for props.time_left.units().into_iter().map(|(label, value)| html! {
                <div class="countdown-unit">
                    <span class="countdown-value">{value}</span>
                    <span class="countdown-label">{label}</span>
                </div>
            }) }
        </div>
    }
}

#[function_component(Waitlist)]
pub fn waitlist() -> Html {
    // Deadline is fixed by the first render and carried inside the state.
    let countdown = use_state(|| Countdown::mount(Utc::now()));
    let signup = use_state(Signup::default);
    let email_ref = use_node_ref();

    {
        let finished = timer_key(&countdown);
        let countdown = countdown.clone();
        use_effect_with_deps(
            move |finished: &bool| {
                let mut interval = None;
                if !*finished {
                    let mounted = *countdown;
                    interval = Some(Interval::new(TICK_INTERVAL_MS, move || {
                        countdown.set(mounted.advance(Utc::now()));
                    }));
                }
                // Runs on unmount and once the countdown reports finished.
                move || drop(interval)
            },
            finished,
        );
    }

    let onsubmit = {
        let signup = signup.clone();
        let email_ref = email_ref.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();
            let mut next = *signup;
            if !next.submit() {
                return;
            }
            signup.set(next);

            let email = email_ref
                .cast::<HtmlInputElement>()
                .map(|input| input.value())
                .unwrap_or_default();
            spawn_local(async move {
                match api::join_waitlist(email).await {
                    Ok(response) => info!("Waitlist signup {}: {}", response.status, response.message),
                    Err(e) => error!("Waitlist signup failed: {}", e),
                }
            });
        })
    };

    let panel = Panel::for_signup(&signup);
    let submitted = panel == Panel::Confirmation;
    let launch_date = countdown.deadline().at().format("%B %-d, %Y").to_string();
    let background_style = format!("background-image: url('{}');", config::background_image_url());

    html! {
        <div class="waitlist-page">
            <style>
                {r#"
                    .waitlist-page {
                        position: relative;
                        min-height: 100vh;
                        display: flex;
                        flex-direction: column;
                        align-items: center;
                        justify-content: center;
                        padding: 2rem;
                        color: #fff;
                        font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
                        overflow: hidden;
                    }
                    .waitlist-background {
                        position: fixed;
                        top: 0;
                        left: 0;
                        width: 100%;
                        height: 100vh;
                        background-size: cover;
                        background-position: center;
                        background-repeat: no-repeat;
                        z-index: -2;
                        pointer-events: none;
                    }
                    .waitlist-background::after {
                        content: '';
                        position: absolute;
                        inset: 0;
                        background: linear-gradient(to bottom,
                            rgba(10, 10, 10, 0.35) 0%,
                            rgba(10, 10, 10, 0.85) 100%
                        );
                    }
                    .waitlist-logo {
                        width: 96px;
                        height: auto;
                        margin-bottom: 2rem;
                    }
                    .waitlist-content {
                        display: flex;
                        flex-direction: column;
                        align-items: center;
                        width: 100%;
                    }
                    .waitlist-panel {
                        width: 100%;
                        max-width: 480px;
                        text-align: center;
                        background: rgba(30, 30, 30, 0.6);
                        border: 1px solid rgba(255, 255, 255, 0.1);
                        border-radius: 16px;
                        padding: 2.5rem;
                        backdrop-filter: blur(10px);
                        box-shadow: 0 8px 32px rgba(0, 0, 0, 0.3);
                    }
                    .waitlist-panel h1 {
                        font-size: 2.2rem;
                        margin: 0 0 1rem 0;
                    }
                    .waitlist-panel p {
                        color: rgba(255, 255, 255, 0.8);
                        line-height: 1.6;
                        margin: 0 0 1.5rem 0;
                    }
                    .waitlist-form {
                        display: flex;
                        gap: 0.5rem;
                    }
                    .waitlist-form input {
                        flex: 1;
                        padding: 0.8rem 1rem;
                        border-radius: 8px;
                        border: 1px solid rgba(255, 255, 255, 0.2);
                        background: rgba(0, 0, 0, 0.4);
                        color: #fff;
                        font-size: 1rem;
                    }
                    .waitlist-form button {
                        padding: 0.8rem 1.4rem;
                        border: none;
                        border-radius: 8px;
                        background: #fff;
                        color: #111;
                        font-weight: 600;
                        cursor: pointer;
                    }
                    .confirmation-icon {
                        width: 56px;
                        height: 56px;
                        margin-bottom: 1rem;
                    }
                    .countdown {
                        display: flex;
                        gap: 1.5rem;
                        margin-top: 2.5rem;
                        transition: margin-top 0.4s ease;
                    }
                    .countdown-submitted {
                        margin-top: 1.5rem;
                        order: -1;
                        margin-bottom: 1.5rem;
                    }
                    .countdown-finished .countdown-value {
                        color: rgba(255, 255, 255, 0.4);
                    }
                    .countdown-unit {
                        display: flex;
                        flex-direction: column;
                        align-items: center;
                        min-width: 64px;
                    }
                    .countdown-value {
                        font-size: 2.4rem;
                        font-weight: 700;
                        font-variant-numeric: tabular-nums;
                    }
                    .countdown-label {
                        font-size: 0.75rem;
                        text-transform: uppercase;
                        letter-spacing: 0.1em;
                        color: rgba(255, 255, 255, 0.6);
                    }
                    @media (max-width: 600px) {
                        .waitlist-form {
                            flex-direction: column;
                        }
                        .countdown {
                            gap: 0.8rem;
                        }
                    }
                "#}
            </style>
            <div class="waitlist-background" style={background_style}></div>
            <img class="waitlist-logo" src={config::logo_url()} alt="Logo" />
            <div class="waitlist-content">
                <div class="waitlist-panel">
                    if panel == Panel::Confirmation {
                        <>
                        <svg class="confirmation-icon" viewBox="0 0 24 24" fill="none" stroke="#4ade80" stroke-width="2" stroke-linecap="round" stroke-linejoin="round">
                            <circle cx="12" cy="12" r="10" />
                            <polyline points="8 12.5 11 15.5 16 9.5" />
                        </svg>
                        <h1>{"Thank You!"}</h1>
                        <p>{"You're on the list. We'll email you as soon as we launch."}</p>
                        </>
                    } else {
                        <>
                        <h1>{"Something new is coming"}</h1>
                        <p>{format!("Join the waitlist and be the first to know when we launch on {}.", launch_date)}</p>
                        <form class="waitlist-form" {onsubmit}>
                            <input
                                ref={email_ref}
                                type="email"
                                name="email"
                                placeholder="you@example.com"
                                required={true}
                            />
                            <button type="submit">{"Join Waitlist"}</button>
                        </form>
                        </>
                    }
                </div>
                <CountdownDisplay time_left={countdown.time_left()} {submitted} />
            </div>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn mounted() -> Countdown {
        Countdown::mount(Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn panel_follows_the_signup_flag() {
        let mut signup = Signup::default();
        assert_eq!(Panel::for_signup(&signup), Panel::Signup);

        signup.submit();
        assert_eq!(Panel::for_signup(&signup), Panel::Confirmation);
        signup.submit();
        assert_eq!(Panel::for_signup(&signup), Panel::Confirmation);
    }

    #[test]
    fn submitted_countdown_is_repositioned() {
        let time_left = mounted().time_left();

        let open = countdown_classes(&time_left, false);
        assert!(open.contains("countdown"));
        assert!(!open.contains("countdown-submitted"));

        let submitted = countdown_classes(&time_left, true);
        assert!(submitted.contains("countdown"));
        assert!(submitted.contains("countdown-submitted"));
        assert!(!submitted.contains("countdown-finished"));
    }

    #[test]
    fn countdown_keeps_ticking_after_submit() {
        let mut signup = Signup::default();
        let countdown = mounted();
        signup.submit();

        let later = countdown.advance(countdown.deadline().at() - Duration::days(10));
        assert_eq!(Panel::for_signup(&signup), Panel::Confirmation);
        assert!(!timer_key(&later));
        assert_eq!(later.time_left().days, 10);
        assert!(countdown_classes(&later.time_left(), true).contains("countdown-submitted"));
    }

    #[test]
    fn finished_countdown_is_dimmed() {
        let countdown = mounted();
        let done = countdown.advance(countdown.deadline().at());

        assert!(countdown_classes(&done.time_left(), false).contains("countdown-finished"));
    }

    #[test]
    fn timer_key_flips_once_at_the_deadline() {
        let countdown = mounted();
        assert!(!timer_key(&countdown));

        let almost = countdown.advance(countdown.deadline().at() - Duration::seconds(1));
        assert!(!timer_key(&almost));

        let done = almost.advance(countdown.deadline().at());
        assert!(timer_key(&done));
        assert!(timer_key(&done.advance(countdown.deadline().at() + Duration::hours(1))));
    }
}
