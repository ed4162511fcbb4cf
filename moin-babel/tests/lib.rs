// This file is required to make `cargo test` discover tests in subdirectories.

#[cfg(test)]
mod common;

#[cfg(test)]
mod registry;

#[cfg(test)]
mod moinwiki;

#[cfg(test)]
mod creole;

#[cfg(test)]
mod mediawiki;

#[cfg(test)]
mod markdown;

#[cfg(test)]
mod rst;

#[cfg(test)]
mod docbook;

#[cfg(test)]
mod html;

#[cfg(test)]
mod csv;

#[cfg(test)]
mod archive;

#[cfg(test)]
mod highlight;

#[cfg(test)]
mod text;

#[cfg(test)]
mod dom;

#[cfg(test)]
mod transforms;

#[cfg(test)]
mod properties;
