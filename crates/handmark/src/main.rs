use clap::Parser;
use handmark::{
    config::Args,
    detector::{LandmarkNetwork, PalmDetector},
    gui::Window,
    image::JpegBackend,
    session::Session,
    video::webcam::Webcam,
};

fn main() -> anyhow::Result<()> {
    handmark::init_logger!();

    let args = Args::parse();
    log::debug!("{:?}", args);

    let jpeg = JpegBackend::from_env()?;
    log::info!("decoding JPEG frames with {jpeg}");

    let mut detector = LandmarkNetwork::load(&args.model, args.hands_options())?;
    match &args.palm_model {
        Some(path) => detector = detector.with_palm_detector(PalmDetector::load(path)?),
        None if args.max_hands > 1 => {
            log::warn!("no palm detection model given, only a single hand will be tracked")
        }
        None => {}
    }
    let webcam = Webcam::open(args.webcam_options())?;
    let window = Window::new(args.title.clone());

    let mut session = Session::new(webcam, detector, window)
        .with_style(args.overlay_style())
        .with_overlay(!args.no_overlay)
        .with_retry_policy(args.retry_policy())
        .with_report(args.report());
    session.run()
}
