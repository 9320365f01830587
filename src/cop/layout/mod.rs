pub mod space_around_method_call_operator;

use super::Cop;

pub fn register_all(cops: &mut Vec<Box<dyn Cop>>) {
    cops.push(Box::new(
        space_around_method_call_operator::SpaceAroundMethodCallOperator,
    ));
}
