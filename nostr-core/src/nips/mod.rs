//! NIP extensions built on top of the event model.
pub mod nip01;
pub mod nip02;
pub mod nip10;
pub mod nip13;
pub mod nip17;
pub mod nip19;
pub mod nip51;
pub mod nip57;
pub mod nip59;
pub mod nip65;
