pub mod curve;
pub mod orderer;
pub mod quantizer;
pub mod reading;
pub mod sequencer;
pub mod synthesizer;

pub mod utils {
    pub mod image_helper;
}
