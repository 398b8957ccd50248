pub mod fixtures;

#[cfg(test)]
mod membership_tests;
#[cfg(test)]
mod presence_tests;
#[cfg(test)]
mod notification_tests;
#[cfg(test)]
mod feed_tests;
