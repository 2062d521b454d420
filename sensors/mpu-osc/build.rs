fn main() {
    // Propagate ESP-IDF link arguments and cfgs
    embuild::espidf::sysenv::output();
}
