pub mod concat_mp3;
pub mod concatenate;
pub mod silence;
pub mod wav;
